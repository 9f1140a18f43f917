use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Details of the failure.
        message: String,
    },

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Rejected survey payload.
    #[error("Survey error: {0}")]
    Survey(#[from] SurveyError),

    /// Anything else, such as unreadable input files.
    #[error("Internal error: {message}")]
    Internal {
        /// Details of the failure.
        message: String,
    },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not open the database.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Details of the failure.
        message: String,
    },

    /// A query or column conversion failed.
    #[error("Query failed: {message}")]
    Query {
        /// Details of the failure.
        message: String,
    },

    /// No study with this ID.
    #[error("Study not found: {study_id}")]
    StudyNotFound {
        /// Requested study ID.
        study_id: String,
    },

    /// No study shared under this token.
    #[error("No study shared under token: {token}")]
    ShareTokenNotFound {
        /// Requested share token.
        token: String,
    },

    /// No invitation with this ID for the study.
    #[error("Invitation not found: {invitation_id}")]
    InvitationNotFound {
        /// Requested invitation ID.
        invitation_id: String,
    },

    /// Schema migration failed.
    #[error("Migration failed: {message}")]
    Migration {
        /// Details of the failure.
        message: String,
    },

    /// Raw driver error.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Errors raised while decoding or validating survey payloads
#[derive(Debug, Error)]
pub enum SurveyError {
    /// Answer key is not a question index.
    #[error("Invalid question index: {key}")]
    InvalidQuestionIndex {
        /// Offending JSON key.
        key: String,
    },

    /// Answer index past the end of the question list.
    #[error("Answer for question {index} does not exist in a survey of {question_count} questions")]
    UnknownQuestion {
        /// Question index of the answer.
        index: usize,
        /// Number of questions in the study.
        question_count: usize,
    },

    /// Answer value of an unsupported JSON type.
    #[error("Invalid answer for question {index}: {reason}")]
    InvalidAnswer {
        /// Question index of the answer.
        index: usize,
        /// Why the answer was rejected.
        reason: String,
    },

    /// Study has no questions to answer.
    #[error("Study {study_id} has no survey questions")]
    EmptyQuestions {
        /// Requested study ID.
        study_id: String,
    },

    /// Malformed JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for survey payload handling
pub type SurveyResult<T> = Result<T, SurveyError>;
