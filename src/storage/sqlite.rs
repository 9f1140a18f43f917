use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{Storage, Study, StudyMetrics, SurveyInvitation};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::survey::{ResponseData, SurveyResponse};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create a private in-memory database, mainly for tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // Every connection to :memory: is a separate database, so pin to one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_study(&self, study: &Study) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO studies (
                id, impact_study_name, program_name, client, user_role, program_type,
                sector, program_start_date, program_end_date, program_reason,
                stakeholders, uploaded_files, survey_questions, sample_size,
                ir_metric, completion_percentage, insight, status, progress,
                share_token, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&study.id)
        .bind(&study.impact_study_name)
        .bind(&study.program_name)
        .bind(&study.client)
        .bind(&study.user_role)
        .bind(&study.program_type)
        .bind(&study.sector)
        .bind(&study.program_start_date)
        .bind(&study.program_end_date)
        .bind(&study.program_reason)
        .bind(to_json(&study.stakeholders)?)
        .bind(to_json(&study.uploaded_files)?)
        .bind(to_json(&study.survey_questions)?)
        .bind(study.sample_size.as_ref().map(to_json).transpose()?)
        .bind(study.ir_metric)
        .bind(i64::from(study.completion_percentage))
        .bind(&study.insight)
        .bind(study.status.to_string())
        .bind(i64::from(study.progress))
        .bind(&study.share_token)
        .bind(study.created_at.to_rfc3339())
        .bind(study.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(study_id = %study.id, "Study created");
        Ok(())
    }

    async fn get_study(&self, id: &str) -> StorageResult<Option<Study>> {
        let row: Option<StudyRow> =
            sqlx::query_as(&format!("SELECT {} FROM studies WHERE id = ?", STUDY_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Study::try_from).transpose()
    }

    async fn get_study_by_share_token(&self, token: &str) -> StorageResult<Option<Study>> {
        let row: Option<StudyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM studies WHERE share_token = ?",
            STUDY_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Study::try_from).transpose()
    }

    async fn list_studies(&self) -> StorageResult<Vec<Study>> {
        let rows: Vec<StudyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM studies ORDER BY created_at ASC",
            STUDY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Study::try_from).collect()
    }

    async fn update_study(&self, study: &Study) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE studies
            SET impact_study_name = ?, program_name = ?, client = ?, user_role = ?,
                program_type = ?, sector = ?, program_start_date = ?, program_end_date = ?,
                program_reason = ?, stakeholders = ?, uploaded_files = ?, survey_questions = ?,
                sample_size = ?, ir_metric = ?, completion_percentage = ?, insight = ?,
                status = ?, progress = ?, share_token = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&study.impact_study_name)
        .bind(&study.program_name)
        .bind(&study.client)
        .bind(&study.user_role)
        .bind(&study.program_type)
        .bind(&study.sector)
        .bind(&study.program_start_date)
        .bind(&study.program_end_date)
        .bind(&study.program_reason)
        .bind(to_json(&study.stakeholders)?)
        .bind(to_json(&study.uploaded_files)?)
        .bind(to_json(&study.survey_questions)?)
        .bind(study.sample_size.as_ref().map(to_json).transpose()?)
        .bind(study.ir_metric)
        .bind(i64::from(study.completion_percentage))
        .bind(&study.insight)
        .bind(study.status.to_string())
        .bind(i64::from(study.progress))
        .bind(&study.share_token)
        .bind(study.updated_at.to_rfc3339())
        .bind(&study.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::StudyNotFound {
                study_id: study.id.clone(),
            });
        }

        Ok(())
    }

    async fn delete_study(&self, id: &str) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM studies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_share_token(&self, study_id: &str, token: &str) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE studies SET share_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(Utc::now().to_rfc3339())
            .bind(study_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_study_metrics(&self, metrics: &StudyMetrics) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE studies
            SET ir_metric = COALESCE(?, ir_metric),
                insight = COALESCE(?, insight),
                completion_percentage = COALESCE(?, completion_percentage),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(metrics.rating.ir_metric)
        .bind(&metrics.rating.insight)
        .bind(metrics.completion_percentage.map(i64::from))
        .bind(metrics.status.map(|s| s.to_string()))
        .bind(Utc::now().to_rfc3339())
        .bind(&metrics.study_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::StudyNotFound {
                study_id: metrics.study_id.clone(),
            });
        }

        Ok(())
    }

    async fn create_invitation(&self, invitation: &SurveyInvitation) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO survey_invitations (id, study_id, email, name, created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invitation.id)
        .bind(&invitation.study_id)
        .bind(&invitation.email)
        .bind(&invitation.name)
        .bind(invitation.created_at.to_rfc3339())
        .bind(invitation.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_invitations(&self, study_id: &str) -> StorageResult<Vec<SurveyInvitation>> {
        let rows: Vec<InvitationRow> = sqlx::query_as(
            r#"
            SELECT id, study_id, email, name, created_at, completed_at
            FROM survey_invitations
            WHERE study_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(study_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn mark_invitation_completed(&self, invitation_id: &str) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE survey_invitations SET completed_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(invitation_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_response(&self, response: &SurveyResponse) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO survey_responses (id, study_id, invitation_id, response_data, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&response.id)
        .bind(&response.study_id)
        .bind(&response.invitation_id)
        .bind(to_json(&response.response_data)?)
        .bind(response.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_responses(&self, study_id: &str) -> StorageResult<Vec<SurveyResponse>> {
        let rows: Vec<ResponseRow> = sqlx::query_as(
            r#"
            SELECT id, study_id, invitation_id, response_data, submitted_at
            FROM survey_responses
            WHERE study_id = ?
            ORDER BY submitted_at ASC
            "#,
        )
        .bind(study_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SurveyResponse::try_from).collect()
    }

    async fn get_response_count(&self, study_id: &str) -> StorageResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM survey_responses WHERE study_id = ?")
                .bind(study_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.max(0) as u64)
    }
}

const STUDY_COLUMNS: &str = "id, impact_study_name, program_name, client, user_role, \
    program_type, sector, program_start_date, program_end_date, program_reason, \
    stakeholders, uploaded_files, survey_questions, sample_size, ir_metric, \
    completion_percentage, insight, status, progress, share_token, created_at, updated_at";

fn to_json<T: Serialize + ?Sized>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Query {
        message: format!("Failed to serialize column: {}", e),
    })
}

fn from_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw).map_err(|e| StorageError::Query {
        message: format!("Corrupt {} column: {}", column, e),
    })
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct StudyRow {
    id: String,
    impact_study_name: String,
    program_name: String,
    client: Option<String>,
    user_role: String,
    program_type: String,
    sector: Option<String>,
    program_start_date: String,
    program_end_date: Option<String>,
    program_reason: String,
    stakeholders: String,
    uploaded_files: String,
    survey_questions: String,
    sample_size: Option<String>,
    ir_metric: Option<f64>,
    completion_percentage: i64,
    insight: Option<String>,
    status: String,
    progress: i64,
    share_token: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<StudyRow> for Study {
    type Error = StorageError;

    fn try_from(row: StudyRow) -> Result<Self, Self::Error> {
        Ok(Self {
            stakeholders: from_json("stakeholders", &row.stakeholders)?,
            uploaded_files: from_json("uploaded_files", &row.uploaded_files)?,
            survey_questions: from_json("survey_questions", &row.survey_questions)?,
            sample_size: row
                .sample_size
                .as_deref()
                .map(|raw| from_json("sample_size", raw))
                .transpose()?,
            status: row.status.parse().unwrap_or_default(),
            completion_percentage: u32::try_from(row.completion_percentage).unwrap_or(0),
            progress: u32::try_from(row.progress).unwrap_or(0),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
            id: row.id,
            impact_study_name: row.impact_study_name,
            program_name: row.program_name,
            client: row.client,
            user_role: row.user_role,
            program_type: row.program_type,
            sector: row.sector,
            program_start_date: row.program_start_date,
            program_end_date: row.program_end_date,
            program_reason: row.program_reason,
            ir_metric: row.ir_metric,
            insight: row.insight,
            share_token: row.share_token,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InvitationRow {
    id: String,
    study_id: String,
    email: String,
    name: Option<String>,
    created_at: String,
    completed_at: Option<String>,
}

impl From<InvitationRow> for SurveyInvitation {
    fn from(row: InvitationRow) -> Self {
        Self {
            id: row.id,
            study_id: row.study_id,
            email: row.email,
            name: row.name,
            created_at: parse_timestamp(&row.created_at),
            completed_at: row.completed_at.as_deref().map(parse_timestamp),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResponseRow {
    id: String,
    study_id: String,
    invitation_id: Option<String>,
    response_data: String,
    submitted_at: String,
}

impl TryFrom<ResponseRow> for SurveyResponse {
    type Error = StorageError;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let response_data: ResponseData = from_json("response_data", &row.response_data)?;

        Ok(Self {
            id: row.id,
            study_id: row.study_id,
            invitation_id: row.invitation_id,
            response_data,
            submitted_at: parse_timestamp(&row.submitted_at),
        })
    }
}
