//! Audit trail repository for database operations on `audit_log`.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::{AppError, AuditEntry, DbError, NewAuditEntryParams};

/// Audit trail repository for database operations on `audit_log`.
///
/// Entries reference their subject by entity name and stringified id so
/// the trail survives deletion of the row it describes.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry to the audit trail.
    pub async fn record(&self, params: NewAuditEntryParams<'_>) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO audit_log (reviewer_id, action, entity, entity_id, details) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(params.reviewer_id)
        .bind(params.action)
        .bind(params.entity)
        .bind(params.entity_id)
        .bind(params.details)
        .execute(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(())
    }

    /// List the trail for one entity, newest first, with reviewer
    /// identity joined in for display.
    pub async fn list_for_entity(
        &self,
        entity: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, AppError> {
        let rows = sqlx::query_as::<_, AuditEntry>(
            "SELECT a.id, \
                    a.reviewer_id, \
                    r.name AS reviewer_name, \
                    r.email AS reviewer_email, \
                    a.action, \
                    a.entity, \
                    a.entity_id, \
                    a.details, \
                    a.created_at \
               FROM audit_log a \
               LEFT JOIN reviewers r ON r.id = a.reviewer_id \
              WHERE a.entity = $1 \
                AND a.entity_id = $2 \
              ORDER BY a.created_at DESC",
        )
        .bind(entity)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(rows)
    }

    /// Count distinct entities with a status change at or after the
    /// cutoff. Backs the "analyzed this month" dashboard figure.
    pub async fn analyzed_since(&self, since: DateTime<Utc>) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT entity_id) \
               FROM audit_log \
              WHERE created_at >= $1 \
                AND action = 'status_change'",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(count)
    }
}
