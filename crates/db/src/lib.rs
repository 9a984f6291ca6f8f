//! Database layer with SQLx for the credentialing service.
//!
//! Provides:
//! - Connection pool management via [`create_pool`]
//! - Repository pattern for data access via [`Database`]
//! - Models typed against the `PostgreSQL` schema
//!
//! # Example
//!
//! ```ignore
//! use cred_db::{create_pool, Database, DbConfig};
//!
//! let config = DbConfig::new(url, 1, 10, Duration::from_secs(5));
//! let pool = create_pool(&config).await?;
//! let db = Database::new(pool);
//!
//! // Use repositories
//! let registration = db.registrations.get(id).await?;
//! ```

#![expect(clippy::doc_markdown, reason = "SQLx capitalization is intentional")]

mod models;
mod repository;

use cred_core::AppError;

// =============================================================================
// Internal helpers
// =============================================================================

/// Database error wrapper for ergonomic error conversion.
///
/// Wraps `sqlx::Error` to enable automatic conversion to `AppError`
/// via the `?` operator throughout repository methods.
#[derive(Debug)]
struct DbError(sqlx::Error);

impl From<sqlx::Error> for DbError {
    #[inline]
    fn from(e: sqlx::Error) -> Self {
        Self(e)
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e.0 {
            sqlx::Error::RowNotFound => Self::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::AlreadyExists(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Self::InvalidArgument(db.message().to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

// =============================================================================
// Public exports - Enums
// =============================================================================

pub use models::{AuditAction, PersonType, RegistrationStatus, ReviewerRole};

// =============================================================================
// Public exports - Database models (own their data)
// =============================================================================

pub use models::{
    AuditEntry, Document, MonthlyCount, Registration, Reviewer, StatusCount, VolumeCounts,
};

// =============================================================================
// Public exports - Parameter types (borrow from caller)
// =============================================================================

pub use models::{
    NewAuditEntryParams, NewDocumentParams, NewRegistrationParams, NewReviewerParams,
    RegistrationFilter, RegistrationOrder, UpdateRegistrationParams,
};

// =============================================================================
// Public exports - Repository and config
// =============================================================================

pub use repository::{
    AuditRepository, Database, DashboardRepository, DbConfig, DocumentRepository,
    RegistrationRepository, ReviewerRepository, create_pool,
};

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct ConstraintError {
        unique: bool,
    }

    impl fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("constraint violated")
        }
    }

    impl StdError for ConstraintError {}

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: AppError = DbError(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn unique_violation_maps_to_already_exists() {
        let source = sqlx::Error::Database(Box::new(ConstraintError { unique: true }));
        let err: AppError = DbError(source).into();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[test]
    fn foreign_key_violation_maps_to_invalid_argument() {
        let source = sqlx::Error::Database(Box::new(ConstraintError { unique: false }));
        let err: AppError = DbError(source).into();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn connection_errors_map_to_unavailable() {
        let err: AppError = DbError(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
