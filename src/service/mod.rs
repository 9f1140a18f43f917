//! Study workflows on top of a [`Storage`] backend.
//!
//! The central flow is [`ImpactService::submit_response`]: a stakeholder's
//! answers are stored first, then the study's metrics are recomputed from
//! scratch. Recomputation is best-effort; a failure there is logged and never
//! fails the submission.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, StorageError, SurveyError};
use crate::rating::{self, PortfolioSummary};
use crate::storage::{Storage, Study, StudyIntake, StudyMetrics, StudyStatus, SurveyInvitation};
use crate::survey::{GeneratedSurvey, ResponseData, SurveyResponse};

/// Answers submitted through a study's public survey link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSubmission {
    /// Answers keyed by question index.
    pub response_data: ResponseData,
    /// Invitation the respondent followed, if any.
    #[serde(default)]
    pub invitation_id: Option<String>,
}

impl ResponseSubmission {
    /// Submission without an invitation.
    pub fn new(response_data: ResponseData) -> Self {
        Self {
            response_data,
            invitation_id: None,
        }
    }

    /// Attribute the submission to an invitation.
    pub fn with_invitation(mut self, invitation_id: impl Into<String>) -> Self {
        self.invitation_id = Some(invitation_id.into());
        self
    }
}

/// Outcome of a recorded submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    /// ID of the stored response.
    pub response_id: String,
    /// Study the response belongs to.
    pub study_id: String,
    /// Recomputed metrics; `None` when recomputation failed.
    pub metrics: Option<StudyMetrics>,
}

/// Percentage of invitations answered, `None` when nobody was invited.
///
/// Responses arriving through the share link without an invitation count
/// too, so the value can exceed 100.
pub fn completion_percentage(responses: usize, invitations: usize) -> Option<u32> {
    if invitations == 0 {
        return None;
    }
    Some(((responses as f64 / invitations as f64) * 100.0).round() as u32)
}

/// Study operations shared by every front end.
pub struct ImpactService<S> {
    storage: S,
}

impl<S: Storage> ImpactService<S> {
    /// Create a new service over a storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get the underlying storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create a study from a completed intake form
    pub async fn create_study(&self, intake: StudyIntake) -> AppResult<Study> {
        let study = Study::from_intake(intake);
        self.storage.create_study(&study).await?;

        info!(study_id = %study.id, name = %study.impact_study_name, "Study created");
        Ok(study)
    }

    /// Replace a study's survey with generator output
    ///
    /// When the study already has responses, its metrics are recomputed
    /// against the new questions. As with submissions, a recompute failure
    /// is logged and the import still succeeds.
    pub async fn import_survey(&self, study_id: &str, survey: GeneratedSurvey) -> AppResult<Study> {
        let mut study = self.require_study(study_id).await?;

        let existing = self.storage.get_response_count(study_id).await?;
        if existing > 0 {
            warn!(
                study_id,
                responses = existing,
                "Replacing questions of a study with responses; stored answer indices may no longer match"
            );
        }

        for (level, count) in survey.level_counts() {
            if count == 0 {
                warn!(study_id, level = %level, "Imported survey has no questions for level");
            }
        }
        let unrecognized = survey
            .questions
            .iter()
            .filter(|q| !q.level.is_canonical())
            .count();
        if unrecognized > 0 {
            warn!(
                study_id,
                unrecognized, "Questions with unrecognized levels carry no weight in the rating"
            );
        }

        study.survey_questions = survey.questions;
        study.sample_size = survey.sample_size;
        study.updated_at = chrono::Utc::now();
        self.storage.update_study(&study).await?;

        info!(
            study_id,
            questions = study.survey_questions.len(),
            "Survey imported"
        );

        if existing > 0 {
            match self.recompute_study(study_id).await {
                Ok(metrics) => study.apply_metrics(&metrics),
                Err(e) => {
                    warn!(study_id, error = %e, "Impact rating recomputation failed after import");
                }
            }
        }

        Ok(study)
    }

    /// Invite a stakeholder to answer a study's survey
    pub async fn invite(
        &self,
        study_id: &str,
        email: &str,
        name: Option<String>,
    ) -> AppResult<SurveyInvitation> {
        self.require_study(study_id).await?;

        let mut invitation = SurveyInvitation::new(study_id, email);
        if let Some(name) = name {
            invitation = invitation.with_name(name);
        }
        self.storage.create_invitation(&invitation).await?;

        info!(study_id, invitation_id = %invitation.id, "Invitation created");
        Ok(invitation)
    }

    /// Generate a public share token for a study
    pub async fn share_study(&self, study_id: &str) -> AppResult<String> {
        let token = Uuid::new_v4().simple().to_string();

        if !self.storage.set_share_token(study_id, &token).await? {
            return Err(StorageError::StudyNotFound {
                study_id: study_id.to_string(),
            }
            .into());
        }

        info!(study_id, "Share token generated");
        Ok(token)
    }

    /// Record a survey response and refresh the study's metrics
    pub async fn submit_response(
        &self,
        share_token: &str,
        submission: ResponseSubmission,
    ) -> AppResult<SubmissionReceipt> {
        let study = self
            .storage
            .get_study_by_share_token(share_token)
            .await?
            .ok_or_else(|| StorageError::ShareTokenNotFound {
                token: share_token.to_string(),
            })?;

        if study.survey_questions.is_empty() {
            return Err(SurveyError::EmptyQuestions {
                study_id: study.id.clone(),
            }
            .into());
        }
        submission
            .response_data
            .validate_against(study.survey_questions.len())?;

        if let Some(invitation_id) = &submission.invitation_id {
            let invitations = self.storage.get_invitations(&study.id).await?;
            let invitation = invitations
                .iter()
                .find(|inv| &inv.id == invitation_id)
                .ok_or_else(|| StorageError::InvitationNotFound {
                    invitation_id: invitation_id.clone(),
                })?;
            if invitation.is_completed() {
                warn!(invitation_id = %invitation_id, "Invitation already answered; recording another response");
            }
        }

        let mut response = SurveyResponse::new(&study.id, submission.response_data);
        if let Some(invitation_id) = submission.invitation_id {
            response = response.with_invitation(invitation_id);
        }
        self.storage.create_response(&response).await?;

        info!(
            study_id = %study.id,
            response_id = %response.id,
            answers = response.response_data.len(),
            "Survey response recorded"
        );

        if let Some(invitation_id) = &response.invitation_id {
            if let Err(e) = self.storage.mark_invitation_completed(invitation_id).await {
                warn!(invitation_id = %invitation_id, error = %e, "Failed to mark invitation completed");
            }
        }

        let metrics = match self.recompute_study(&study.id).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(study_id = %study.id, error = %e, "Impact rating recomputation failed");
                None
            }
        };

        Ok(SubmissionReceipt {
            response_id: response.id,
            study_id: study.id,
            metrics,
        })
    }

    /// Recompute and persist a study's rating, completion, and status
    pub async fn recompute_study(&self, study_id: &str) -> AppResult<StudyMetrics> {
        let study = self.require_study(study_id).await?;
        let responses = self.storage.get_responses(study_id).await?;
        let invitations = self.storage.get_invitations(study_id).await?;

        let rating = rating::evaluate(&responses, &study.survey_questions);
        let completion = completion_percentage(responses.len(), invitations.len());
        let status = completion
            .filter(|pct| *pct >= 100)
            .map(|_| StudyStatus::Completed);

        let metrics = StudyMetrics {
            study_id: study_id.to_string(),
            rating,
            completion_percentage: completion,
            status,
            response_count: responses.len(),
            invitation_count: invitations.len(),
        };
        self.storage.update_study_metrics(&metrics).await?;

        if !metrics.rating.is_available() {
            debug!(study_id, "Insufficient data; previous rating kept");
        }
        info!(
            study_id,
            ir_metric = ?metrics.rating.ir_metric,
            completion = ?metrics.completion_percentage,
            responses = metrics.response_count,
            "Study metrics recomputed"
        );
        Ok(metrics)
    }

    /// Summarize all studies
    pub async fn portfolio(&self) -> AppResult<PortfolioSummary> {
        let studies = self.storage.list_studies().await?;
        Ok(PortfolioSummary::from_studies(&studies))
    }

    async fn require_study(&self, study_id: &str) -> AppResult<Study> {
        self.storage.get_study(study_id).await?.ok_or_else(|| {
            StorageError::StudyNotFound {
                study_id: study_id.to_string(),
            }
            .into()
        })
    }
}
