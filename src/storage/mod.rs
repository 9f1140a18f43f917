//! Storage layer for impact studies.
//!
//! This module provides SQLite-based storage for studies, survey
//! invitations, and survey responses.

mod sqlite;


pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::rating::ImpactRating;
use crate::survey::{SampleSize, SurveyQuestion, SurveyResponse};

/// Default intake progress of a freshly created study.
pub const DEFAULT_PROGRESS: u32 = 15;

/// Lifecycle status of a study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyStatus {
    /// Intake not yet finished.
    Draft,
    /// Survey is collecting responses.
    #[default]
    #[serde(rename = "In Progress")]
    InProgress,
    /// Every invited stakeholder has responded.
    Completed,
}

impl std::fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StudyStatus::Draft => write!(f, "Draft"),
            StudyStatus::InProgress => write!(f, "In Progress"),
            StudyStatus::Completed => write!(f, "Completed"),
        }
    }
}

impl std::str::FromStr for StudyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(StudyStatus::Draft),
            "in progress" | "in_progress" => Ok(StudyStatus::InProgress),
            "completed" => Ok(StudyStatus::Completed),
            _ => Err(format!("Unknown study status: {}", s)),
        }
    }
}

/// A training impact study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Study {
    /// Unique study identifier.
    pub id: String,
    /// Display name of the study.
    pub impact_study_name: String,
    /// Name of the evaluated training program.
    pub program_name: String,
    /// Client organization, when run for one.
    pub client: Option<String>,
    /// Role of the person who set up the study.
    pub user_role: String,
    /// Program category, e.g. Leadership or Technical.
    pub program_type: String,
    /// Industry sector.
    pub sector: Option<String>,
    /// Program start date as entered.
    pub program_start_date: String,
    /// Program end date as entered.
    pub program_end_date: Option<String>,
    /// Why the program was run.
    pub program_reason: String,
    /// Stakeholder groups to survey.
    pub stakeholders: Vec<String>,
    /// Metadata of supporting documents, kept opaque.
    pub uploaded_files: Vec<serde_json::Value>,
    /// Generated survey; answer indices point into this list.
    pub survey_questions: Vec<SurveyQuestion>,
    /// Recommended number of respondents.
    pub sample_size: Option<SampleSize>,
    /// Last computed Impact Rating.
    pub ir_metric: Option<f64>,
    /// Share of invitations that produced a response.
    pub completion_percentage: u32,
    /// Narrative for the last computed Impact Rating.
    pub insight: Option<String>,
    /// Lifecycle status.
    pub status: StudyStatus,
    /// Intake progress, 0-100.
    pub progress: u32,
    /// Token of the public survey link.
    pub share_token: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Study {
    /// Create a new study with empty intake details
    pub fn new(impact_study_name: impl Into<String>, program_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            impact_study_name: impact_study_name.into(),
            program_name: program_name.into(),
            client: None,
            user_role: String::new(),
            program_type: String::new(),
            sector: None,
            program_start_date: String::new(),
            program_end_date: None,
            program_reason: String::new(),
            stakeholders: Vec::new(),
            uploaded_files: Vec::new(),
            survey_questions: Vec::new(),
            sample_size: None,
            ir_metric: None,
            completion_percentage: 0,
            insight: None,
            status: StudyStatus::default(),
            progress: DEFAULT_PROGRESS,
            share_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a study from a completed intake form
    pub fn from_intake(intake: StudyIntake) -> Self {
        let mut study = Self::new(intake.impact_study_name, intake.program_name);
        study.client = intake.client;
        study.user_role = intake.user_role;
        study.program_type = intake.program_type;
        study.sector = intake.sector;
        study.program_start_date = intake.program_start_date;
        study.program_end_date = intake.program_end_date;
        study.program_reason = intake.program_reason;
        study.stakeholders = intake.stakeholders;
        study.uploaded_files = intake.uploaded_files;
        study.survey_questions = intake.survey_questions;
        study.sample_size = intake.sample_size;
        study
    }

    /// Set the survey questions
    pub fn with_questions(mut self, questions: Vec<SurveyQuestion>) -> Self {
        self.survey_questions = questions;
        self
    }

    /// Apply recomputed metrics; `None` fields leave the current value.
    pub fn apply_metrics(&mut self, metrics: &StudyMetrics) {
        if let Some(score) = metrics.rating.ir_metric {
            self.ir_metric = Some(score);
        }
        if let Some(insight) = &metrics.rating.insight {
            self.insight = Some(insight.clone());
        }
        if let Some(pct) = metrics.completion_percentage {
            self.completion_percentage = pct;
        }
        if let Some(status) = metrics.status {
            self.status = status;
        }
    }
}

/// Fields collected by the multi-step intake form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyIntake {
    /// Display name of the study.
    pub impact_study_name: String,
    /// Name of the evaluated training program.
    pub program_name: String,
    /// Client organization.
    #[serde(default)]
    pub client: Option<String>,
    /// Role of the person filling in the form.
    pub user_role: String,
    /// Program category.
    pub program_type: String,
    /// Industry sector.
    #[serde(default)]
    pub sector: Option<String>,
    /// Program start date.
    pub program_start_date: String,
    /// Program end date.
    #[serde(default)]
    pub program_end_date: Option<String>,
    /// Why the program was run.
    pub program_reason: String,
    /// Stakeholder groups to survey.
    pub stakeholders: Vec<String>,
    /// Metadata of supporting documents.
    #[serde(default)]
    pub uploaded_files: Vec<serde_json::Value>,
    /// Survey questions, if already generated.
    #[serde(default)]
    pub survey_questions: Vec<SurveyQuestion>,
    /// Recommended sample size, if already generated.
    #[serde(default)]
    pub sample_size: Option<SampleSize>,
}

/// An invitation sent to a stakeholder to answer a study's survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyInvitation {
    /// Unique invitation identifier.
    pub id: String,
    /// Parent study ID.
    pub study_id: String,
    /// Recipient email address.
    pub email: String,
    /// Optional recipient name.
    pub name: Option<String>,
    /// When the invitation was created.
    pub created_at: DateTime<Utc>,
    /// When the recipient submitted a response.
    pub completed_at: Option<DateTime<Utc>>,
}

impl SurveyInvitation {
    /// Create a new invitation for a study
    pub fn new(study_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            study_id: study_id.into(),
            email: email.into(),
            name: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Set the recipient name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether the invitation has been answered
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Derived study fields recomputed after each submission.
///
/// `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyMetrics {
    /// Study the metrics belong to.
    pub study_id: String,
    /// Score and insight; both `None` on insufficient data.
    #[serde(flatten)]
    pub rating: ImpactRating,
    /// Responses per invitation, `None` when nobody was invited.
    pub completion_percentage: Option<u32>,
    /// New status, `None` to keep the current one.
    pub status: Option<StudyStatus>,
    /// Responses the metrics were computed from.
    pub response_count: usize,
    /// Invitations counted for completion.
    pub invitation_count: usize,
}

/// Storage trait for database operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Storage: Send + Sync {
    // Study operations

    /// Create a new study.
    async fn create_study(&self, study: &Study) -> StorageResult<()>;
    /// Get a study by ID.
    async fn get_study(&self, id: &str) -> StorageResult<Option<Study>>;
    /// Get a study by its public share token.
    async fn get_study_by_share_token(&self, token: &str) -> StorageResult<Option<Study>>;
    /// List all studies, oldest first.
    async fn list_studies(&self) -> StorageResult<Vec<Study>>;
    /// Replace all fields of an existing study.
    async fn update_study(&self, study: &Study) -> StorageResult<()>;
    /// Delete a study with its invitations and responses. Returns whether it existed.
    async fn delete_study(&self, id: &str) -> StorageResult<bool>;
    /// Store a share token on a study. Returns whether the study exists.
    async fn set_share_token(&self, study_id: &str, token: &str) -> StorageResult<bool>;
    /// Write back recomputed metrics.
    async fn update_study_metrics(&self, metrics: &StudyMetrics) -> StorageResult<()>;

    // Invitation operations

    /// Create a new invitation.
    async fn create_invitation(&self, invitation: &SurveyInvitation) -> StorageResult<()>;
    /// Get all invitations of a study.
    async fn get_invitations(&self, study_id: &str) -> StorageResult<Vec<SurveyInvitation>>;
    /// Mark an invitation as answered. Returns whether it existed.
    async fn mark_invitation_completed(&self, invitation_id: &str) -> StorageResult<bool>;

    // Response operations

    /// Store a survey response.
    async fn create_response(&self, response: &SurveyResponse) -> StorageResult<()>;
    /// Get all responses of a study in submission order.
    async fn get_responses(&self, study_id: &str) -> StorageResult<Vec<SurveyResponse>>;
    /// Count the responses of a study.
    async fn get_response_count(&self, study_id: &str) -> StorageResult<u64>;
}
