//! Database repository layer with connection pooling for the credentialing schema.
//!
//! # Error Handling
//!
//! All repository methods return `Result<T, AppError>` where errors are:
//! - `AppError::Unavailable` - Database connection or query failures
//! - `AppError::NotFound` - Requested entity does not exist
//! - `AppError::AlreadyExists` - Entity already exists (for creation methods)

#![expect(
    clippy::missing_errors_doc,
    reason = "error handling documented at module level"
)]

mod audit;
mod config;
mod dashboard;
mod document;
mod registration;
mod reviewer;

use sqlx::postgres::PgPool;

pub use audit::AuditRepository;
pub use config::{DbConfig, create_pool};
pub use dashboard::DashboardRepository;
pub use document::DocumentRepository;
pub use registration::RegistrationRepository;
pub use reviewer::ReviewerRepository;

/// Combined database context.
#[derive(Debug, Clone)]
pub struct Database {
    pub registrations: RegistrationRepository,
    pub documents: DocumentRepository,
    pub audit: AuditRepository,
    pub reviewers: ReviewerRepository,
    pub dashboard: DashboardRepository,
    pool: PgPool,
}

impl Database {
    /// Creates a new database context with all repositories.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            registrations: RegistrationRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            audit: AuditRepository::new(pool.clone()),
            reviewers: ReviewerRepository::new(pool.clone()),
            dashboard: DashboardRepository::new(pool.clone()),
            pool,
        }
    }

    /// Check database health by executing a simple query.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }

    /// Returns a reference to the underlying connection pool.
    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
