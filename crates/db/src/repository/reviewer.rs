//! Reviewer repository for database operations on `reviewers`.

use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{AppError, DbError, NewReviewerParams, Reviewer};

const COLUMNS: &str =
    "id, name, email, password, role, is_active, last_login, created_at, updated_at";

/// Reviewer repository for database operations on `reviewers`.
#[derive(Debug, Clone)]
pub struct ReviewerRepository {
    pool: PgPool,
}

impl ReviewerRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get an active reviewer by email, for login.
    pub async fn get_active_by_email(&self, email: &str) -> Result<Reviewer, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM reviewers \
              WHERE email = $1 AND is_active \
              LIMIT 1"
        );
        sqlx::query_as::<_, Reviewer>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Reviewer", email))
    }

    /// Get a reviewer by id.
    pub async fn get(&self, id: Uuid) -> Result<Reviewer, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM reviewers WHERE id = $1");
        sqlx::query_as::<_, Reviewer>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Reviewer", id))
    }

    /// Create a reviewer account.
    pub async fn create(&self, params: NewReviewerParams<'_>) -> Result<Reviewer, AppError> {
        let sql = format!(
            "INSERT INTO reviewers (name, email, password, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Reviewer>(&sql)
            .bind(params.name)
            .bind(params.email)
            .bind(params.password_hash)
            .bind(params.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::AlreadyExists(format!("Reviewer already exists: {}", params.email))
                }
                other => DbError(other).into(),
            })?;
        Ok(row)
    }

    /// Whether any reviewer with this email exists, active or not.
    /// Used by the startup admin bootstrap.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM reviewers WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await
                .map_err(DbError)?;
        Ok(exists)
    }

    /// Stamp a successful login.
    pub async fn record_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE reviewers SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError)?;
        Ok(())
    }
}
