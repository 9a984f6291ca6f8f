//! Dashboard repository: aggregate queries feeding the admin metrics.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;

use crate::{AppError, DbError, MonthlyCount, StatusCount, VolumeCounts};

/// Dashboard repository: aggregate queries feeding the admin metrics.
#[derive(Debug, Clone)]
pub struct DashboardRepository {
    pool: PgPool,
}

impl DashboardRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Total registrations plus trailing 30/60/90 day submission counts,
    /// in a single scan.
    pub async fn volume_counts(&self, now: DateTime<Utc>) -> Result<VolumeCounts, AppError> {
        let row = sqlx::query_as::<_, VolumeCounts>(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE submitted_at >= $1 - INTERVAL '30 days') \
                        AS last_30_days, \
                    COUNT(*) FILTER (WHERE submitted_at >= $1 - INTERVAL '60 days') \
                        AS last_60_days, \
                    COUNT(*) FILTER (WHERE submitted_at >= $1 - INTERVAL '90 days') \
                        AS last_90_days \
               FROM registrations",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(row)
    }

    /// Registration counts grouped by status. Statuses with no rows are
    /// simply absent.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, AppError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count \
               FROM registrations \
              GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(rows)
    }

    /// Submissions per calendar month over the trailing year, oldest
    /// month first.
    pub async fn monthly_volume(&self, now: DateTime<Utc>) -> Result<Vec<MonthlyCount>, AppError> {
        let rows = sqlx::query_as::<_, MonthlyCount>(
            "SELECT date_trunc('month', submitted_at) AS month, \
                    COUNT(*) AS count \
               FROM registrations \
              WHERE submitted_at >= $1 - INTERVAL '365 days' \
              GROUP BY month \
              ORDER BY month",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(rows)
    }

    /// Mean seconds between submission and decision over finalized
    /// registrations, or null when none are finalized.
    pub async fn avg_analysis_seconds(&self) -> Result<Option<f64>, AppError> {
        let avg = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT AVG(EXTRACT(EPOCH FROM \
                        COALESCE(approved_at, rejected_at) - submitted_at))::double precision \
               FROM registrations \
              WHERE status IN ('approved', 'rejected')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(avg)
    }
}
