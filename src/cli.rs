//! Command-line interface for operating on impact studies.
//!
//! Every command prints pretty JSON on success. `score` is pure and works on
//! a snapshot file; all other commands go through the configured database.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, SurveyError};
use crate::rating;
use crate::service::{ImpactService, ResponseSubmission};
use crate::storage::{Storage, StudyIntake};
use crate::survey::{GeneratedSurvey, ResponseData, SurveyQuestion};

/// Training impact studies with Kirkpatrick-weighted Impact Ratings.
#[derive(Parser, Debug)]
#[command(name = "impact-rating", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute the Impact Rating of a snapshot file without touching the database
    Score {
        /// JSON file with `questions` and `responses`
        #[arg(long)]
        input: PathBuf,
    },

    /// Create a study from an intake JSON file
    CreateStudy {
        /// Intake form JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// Replace a study's questions with survey generator output
    ImportSurvey {
        /// Study ID
        #[arg(long)]
        study: String,

        /// JSON file with `questions` and optional `sampleSize`
        #[arg(long)]
        input: PathBuf,
    },

    /// Invite a stakeholder to a study's survey
    Invite {
        /// Study ID
        #[arg(long)]
        study: String,

        /// Recipient email address
        #[arg(long)]
        email: String,

        /// Recipient name
        #[arg(long)]
        name: Option<String>,
    },

    /// Generate a public share token for a study
    Share {
        /// Study ID
        #[arg(long)]
        study: String,
    },

    /// Submit survey answers through a share token
    Submit {
        /// Share token of the study
        #[arg(long)]
        token: String,

        /// JSON file mapping question index to answer
        #[arg(long)]
        input: PathBuf,

        /// Invitation the answers respond to
        #[arg(long)]
        invitation: Option<String>,
    },

    /// Recompute a study's Impact Rating and completion
    Recompute {
        /// Study ID
        #[arg(long)]
        study: String,
    },

    /// Show portfolio-wide metrics
    Portfolio,
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    fn from_json<T: Serialize>(result: AppResult<T>) -> Self {
        match result {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(json) => Self::success(json),
                Err(e) => Self::error(format!("Failed to render output: {}", e)),
            },
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Questions and answers of one study, as consumed by `score`.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    /// Survey questions, in index order.
    pub questions: Vec<SurveyQuestion>,
    /// Answers of every respondent.
    #[serde(default)]
    pub responses: Vec<ResponseData>,
}

/// Output of `score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    /// Impact Rating, `None` on insufficient data.
    pub ir_metric: Option<f64>,
    /// Narrative for the rating.
    pub insight: Option<String>,
    /// Mean rating per level key.
    pub level_means: BTreeMap<String, f64>,
    /// Number of responses scored.
    pub response_count: usize,
}

/// Score a snapshot.
pub fn score_snapshot(snapshot: &Snapshot) -> ScoreReport {
    let rating = rating::evaluate(&snapshot.responses, &snapshot.questions);
    let level_means = rating::level_means(&snapshot.responses, &snapshot.questions)
        .into_iter()
        .map(|(level, mean)| (level.key().to_string(), mean))
        .collect();

    ScoreReport {
        ir_metric: rating.ir_metric,
        insight: rating.insight,
        level_means,
        response_count: snapshot.responses.len(),
    }
}

/// Execute the database-free `score` command.
pub fn execute_score(input: &Path) -> CliResult {
    CliResult::from_json(read_json::<Snapshot>(input).map(|s| score_snapshot(&s)))
}

/// Execute a command against a service.
pub async fn execute_command<S: Storage>(command: Command, service: &ImpactService<S>) -> CliResult {
    match command {
        Command::Score { input } => execute_score(&input),
        Command::CreateStudy { input } => {
            let result = match read_json::<StudyIntake>(&input) {
                Ok(intake) => service.create_study(intake).await,
                Err(e) => Err(e),
            };
            CliResult::from_json(result)
        }
        Command::ImportSurvey { study, input } => {
            let result = match read_text(&input).and_then(|text| {
                GeneratedSurvey::from_completion(&text).map_err(AppError::from)
            }) {
                Ok(survey) => service.import_survey(&study, survey).await,
                Err(e) => Err(e),
            };
            CliResult::from_json(result)
        }
        Command::Invite { study, email, name } => {
            CliResult::from_json(service.invite(&study, &email, name).await)
        }
        Command::Share { study } => CliResult::from_json(
            service
                .share_study(&study)
                .await
                .map(|token| serde_json::json!({ "studyId": study, "shareToken": token })),
        ),
        Command::Submit {
            token,
            input,
            invitation,
        } => {
            let result = match read_json::<ResponseData>(&input) {
                Ok(data) => {
                    let mut submission = ResponseSubmission::new(data);
                    if let Some(invitation_id) = invitation {
                        submission = submission.with_invitation(invitation_id);
                    }
                    service.submit_response(&token, submission).await
                }
                Err(e) => Err(e),
            };
            CliResult::from_json(result)
        }
        Command::Recompute { study } => CliResult::from_json(service.recompute_study(&study).await),
        Command::Portfolio => CliResult::from_json(service.portfolio().await),
    }
}

fn read_text(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| AppError::Internal {
        message: format!("Failed to read {}: {}", path.display(), e),
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| SurveyError::Json(e).into())
}
