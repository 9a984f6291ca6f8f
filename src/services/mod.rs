//! HTTP handlers for the credentialing API.
//!
//! Thin axum handlers over the repository layer: extract, validate,
//! delegate, serialize. Cross-cutting audit recording lives here so
//! every handler treats the trail the same way.

pub mod auth;
pub mod cnpj;
pub mod dashboard;
pub mod documents;
pub mod registrations;

use cred_db::{AuditAction, Database, NewAuditEntryParams};
use tracing::error;
use uuid::Uuid;

/// Entity name used for every audit entry today. Kept as a column so
/// the trail can cover other entities later without a migration.
const AUDIT_ENTITY: &str = "registration";

/// Append an audit entry, logging instead of failing.
///
/// The trail must never take a successful operation down with it, so
/// repository errors stop here.
pub(crate) async fn record_audit(
    db: &Database,
    reviewer_id: Option<Uuid>,
    action: AuditAction,
    entity_id: &str,
    details: &serde_json::Value,
) {
    let details = details.to_string();
    let result = db
        .audit
        .record(NewAuditEntryParams {
            reviewer_id,
            action,
            entity: AUDIT_ENTITY,
            entity_id,
            details: &details,
        })
        .await;

    if let Err(e) = result {
        error!(%entity_id, action = %action, error = %e, "Failed to record audit entry");
    }
}
