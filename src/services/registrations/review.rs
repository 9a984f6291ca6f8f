//! Reviewer workflow: queue listing, triage, decisions.

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use cred_core::validation::{is_valid_email, is_valid_uf};
use cred_core::{AppError, AuthInfo, StrExt, Violations};
use cred_db::{
    AuditAction, Registration, RegistrationFilter, RegistrationOrder, RegistrationStatus,
    UpdateRegistrationParams,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::RegistrationResponse;
use crate::core::messages;
use crate::services::record_audit;
use crate::startup::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub status: Option<String>,
    pub education: Option<String>,
    pub person_type: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListQuery {
    /// Parse the enum-ish parameters, rejecting unknown values.
    pub(super) fn parse(
        &self,
    ) -> Result<
        (
            Option<RegistrationStatus>,
            Option<cred_db::PersonType>,
            RegistrationOrder,
        ),
        AppError,
    > {
        let status = match &self.status {
            Some(raw) => Some(
                raw.parse::<RegistrationStatus>()
                    .map_err(|e| AppError::invalid("status", e))?,
            ),
            None => None,
        };
        let person_type = match &self.person_type {
            Some(raw) => Some(
                raw.parse::<cred_db::PersonType>()
                    .map_err(|e| AppError::invalid("person_type", e))?,
            ),
            None => None,
        };
        let order = match &self.ordering {
            Some(raw) => raw
                .parse::<RegistrationOrder>()
                .map_err(|e| AppError::invalid("ordering", e))?,
            None => RegistrationOrder::default(),
        };
        Ok((status, person_type, order))
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub count: i64,
    pub results: Vec<RegistrationResponse>,
}

/// `GET /api/registrations` — the review queue.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let (status, person_type, order) = query.parse()?;

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let filter = RegistrationFilter {
        status,
        education: query.education.as_deref(),
        person_type,
        search: query.search.as_deref().and_then(|s| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
        order,
        limit: Some(page_size),
        offset: Some((page - 1) * page_size),
    };

    let count = state.db.registrations.count(filter).await?;
    let rows = state.db.registrations.list(filter).await?;

    Ok(Json(ListResponse {
        count,
        results: rows.into_iter().map(Into::into).collect(),
    }))
}

/// `GET /api/registrations/{id}` — single registration, audited as a VIEW.
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegistrationResponse>, AppError> {
    let registration = state.db.registrations.get(id).await?;

    record_audit(
        &state.db,
        Some(auth.user_id),
        AuditAction::View,
        &id.to_string(),
        &json!({}),
    )
    .await;

    Ok(Json(registration.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRegistrationRequest {
    pub status: Option<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub technical_manager_name: Option<String>,
    pub technical_manager_cpf: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub zip_code: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub education: Option<String>,
    pub institution: Option<String>,
    pub graduation_year: Option<i32>,
    pub council_name: Option<String>,
    pub council_number: Option<String>,
    pub specialty: Option<String>,
    pub area_of_action: Option<String>,
    pub experience_years: Option<i32>,
    pub internal_notes: Option<String>,
}

/// Merged column values plus what changed, computed before touching the
/// database.
struct Merged {
    status: RegistrationStatus,
    status_changed: bool,
    changed_fields: Vec<&'static str>,
    approved_by: Option<Uuid>,
    approved_at: Option<DateTime<Utc>>,
    rejected_by: Option<Uuid>,
    rejected_at: Option<DateTime<Utc>>,
}

/// `PATCH /api/registrations/{id}` — partial update and status decisions.
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRegistrationRequest>,
) -> Result<Json<RegistrationResponse>, AppError> {
    validate_patch(&body)?;

    let current = state.db.registrations.get(id).await?;
    let merged = merge(&current, &body, &auth, Utc::now());

    let updated = state
        .db
        .registrations
        .update(UpdateRegistrationParams {
            id,
            status: merged.status,
            name: body.full_name.as_deref().unwrap_or(&current.name),
            company_name: body
                .company_name
                .as_deref()
                .or(current.company_name.as_deref()),
            technical_manager_name: body
                .technical_manager_name
                .as_deref()
                .or(current.technical_manager_name.as_deref()),
            technical_manager_cpf: body
                .technical_manager_cpf
                .as_deref()
                .or(current.technical_manager_cpf.as_deref()),
            email: body.email.as_deref().unwrap_or(&current.email),
            phone: body.phone.as_deref().unwrap_or(&current.phone),
            birth_date: body.birth_date.or(current.birth_date),
            zip_code: body.zip_code.as_deref().unwrap_or(&current.zip_code),
            street: body.street.as_deref().unwrap_or(&current.street),
            number: body.number.as_deref().unwrap_or(&current.number),
            complement: body.complement.as_deref().or(current.complement.as_deref()),
            neighborhood: body
                .neighborhood
                .as_deref()
                .unwrap_or(&current.neighborhood),
            city: body.city.as_deref().unwrap_or(&current.city),
            state: body.state.as_deref().unwrap_or(&current.state),
            education: body.education.as_deref().unwrap_or(&current.education),
            institution: body.institution.as_deref().unwrap_or(&current.institution),
            graduation_year: body.graduation_year.or(current.graduation_year),
            council_name: body
                .council_name
                .as_deref()
                .unwrap_or(&current.council_name),
            council_number: body
                .council_number
                .as_deref()
                .unwrap_or(&current.council_number),
            specialty: body.specialty.as_deref().or(current.specialty.as_deref()),
            area_of_action: body
                .area_of_action
                .as_deref()
                .or(current.area_of_action.as_deref()),
            experience_years: body.experience_years.or(current.experience_years),
            internal_notes: body
                .internal_notes
                .as_deref()
                .or(current.internal_notes.as_deref()),
            approved_by: merged.approved_by,
            approved_at: merged.approved_at,
            rejected_by: merged.rejected_by,
            rejected_at: merged.rejected_at,
        })
        .await?;

    if !merged.changed_fields.is_empty() {
        record_audit(
            &state.db,
            Some(auth.user_id),
            AuditAction::Update,
            &id.to_string(),
            &json!({ "fields": merged.changed_fields }),
        )
        .await;
    }

    if merged.status_changed {
        info!(
            registration_id = %id,
            from = %current.status,
            to = %merged.status,
            reviewer_id = %auth.user_id,
            "Registration status changed"
        );
        record_audit(
            &state.db,
            Some(auth.user_id),
            AuditAction::StatusChange,
            &id.to_string(),
            &json!({ "from": current.status, "to": merged.status }),
        )
        .await;

        let message = messages::status_update(&updated, merged.status);
        if let Err(e) = state.email.send(&message).await {
            warn!(
                registration_id = %id,
                provider = state.email.name(),
                error = %e,
                "Status update email failed"
            );
        }
    }

    Ok(Json(updated.into()))
}

/// Reject patches whose provided fields are malformed. Absent fields
/// are untouched, so only present ones are checked.
fn validate_patch(body: &UpdateRegistrationRequest) -> Result<(), AppError> {
    let mut violations = Violations::new();

    if let Some(raw) = &body.status {
        if raw.parse::<RegistrationStatus>().is_err() {
            violations.add("status", format!("Unknown status: {raw}"));
        }
    }
    if let Some(email) = &body.email {
        if !is_valid_email(email.trim()) {
            violations.add("email", "Must be a valid email address");
        }
    }
    if let Some(state) = &body.state {
        if !is_valid_uf(state.trim()) {
            violations.add("state", "Must be a two-letter UF code");
        }
    }
    if let Some(name) = &body.full_name {
        if name.to_opt().is_none() {
            violations.add("full_name", "Must not be blank");
        }
    }

    violations.finish()
}

/// Resolve the patch against the current row.
///
/// Review stamps are write-once: the first approval or rejection records
/// who decided and when, and later transitions leave that record intact.
fn merge(
    current: &Registration,
    body: &UpdateRegistrationRequest,
    auth: &AuthInfo,
    now: DateTime<Utc>,
) -> Merged {
    let status = body
        .status
        .as_deref()
        .and_then(|raw| raw.parse::<RegistrationStatus>().ok())
        .unwrap_or(current.status);
    let status_changed = status != current.status;

    let mut approved_by = current.approved_by;
    let mut approved_at = current.approved_at;
    let mut rejected_by = current.rejected_by;
    let mut rejected_at = current.rejected_at;

    if status_changed {
        match status {
            RegistrationStatus::Approved if approved_by.is_none() => {
                approved_by = Some(auth.user_id);
                approved_at = Some(now);
            }
            RegistrationStatus::Rejected if rejected_by.is_none() => {
                rejected_by = Some(auth.user_id);
                rejected_at = Some(now);
            }
            _ => {}
        }
    }

    let mut changed_fields = Vec::new();
    let mut track = |field: &'static str, changed: bool| {
        if changed {
            changed_fields.push(field);
        }
    };

    track("full_name", differs(&body.full_name, Some(&current.name)));
    track(
        "company_name",
        differs(&body.company_name, current.company_name.as_ref()),
    );
    track(
        "technical_manager_name",
        differs(
            &body.technical_manager_name,
            current.technical_manager_name.as_ref(),
        ),
    );
    track(
        "technical_manager_cpf",
        differs(
            &body.technical_manager_cpf,
            current.technical_manager_cpf.as_ref(),
        ),
    );
    track("email", differs(&body.email, Some(&current.email)));
    track("phone", differs(&body.phone, Some(&current.phone)));
    track(
        "birth_date",
        body.birth_date.is_some() && body.birth_date != current.birth_date,
    );
    track("zip_code", differs(&body.zip_code, Some(&current.zip_code)));
    track("street", differs(&body.street, Some(&current.street)));
    track("number", differs(&body.number, Some(&current.number)));
    track(
        "complement",
        differs(&body.complement, current.complement.as_ref()),
    );
    track(
        "neighborhood",
        differs(&body.neighborhood, Some(&current.neighborhood)),
    );
    track("city", differs(&body.city, Some(&current.city)));
    track("state", differs(&body.state, Some(&current.state)));
    track(
        "education",
        differs(&body.education, Some(&current.education)),
    );
    track(
        "institution",
        differs(&body.institution, Some(&current.institution)),
    );
    track(
        "graduation_year",
        body.graduation_year.is_some() && body.graduation_year != current.graduation_year,
    );
    track(
        "council_name",
        differs(&body.council_name, Some(&current.council_name)),
    );
    track(
        "council_number",
        differs(&body.council_number, Some(&current.council_number)),
    );
    track(
        "specialty",
        differs(&body.specialty, current.specialty.as_ref()),
    );
    track(
        "area_of_action",
        differs(&body.area_of_action, current.area_of_action.as_ref()),
    );
    track(
        "experience_years",
        body.experience_years.is_some() && body.experience_years != current.experience_years,
    );
    track(
        "internal_notes",
        differs(&body.internal_notes, current.internal_notes.as_ref()),
    );

    Merged {
        status,
        status_changed,
        changed_fields,
        approved_by,
        approved_at,
        rejected_by,
        rejected_at,
    }
}

fn differs(patch: &Option<String>, current: Option<&String>) -> bool {
    match patch {
        Some(value) => Some(value) != current,
        None => false,
    }
}

/// `DELETE /api/registrations/{id}` — remove a registration and its files.
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    // Collect file keys before the rows cascade away.
    let documents = state.db.documents.list(Some(id)).await?;
    state.db.registrations.delete(id).await?;

    for doc in &documents {
        if let Err(e) = state.store.delete(&doc.file_key).await {
            warn!(key = %doc.file_key, error = %e, "Failed to delete stored document");
        }
    }

    info!(registration_id = %id, reviewer_id = %auth.user_id, "Registration deleted");
    record_audit(
        &state.db,
        Some(auth.user_id),
        AuditAction::Delete,
        &id.to_string(),
        &json!({ "documents_removed": documents.len() }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
    pub action: AuditAction,
    pub user_email: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

/// `GET /api/registrations/{id}/history` — the audit trail, newest first.
///
/// The trail outlives its registration, so no existence check here.
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = state
        .db
        .audit
        .list_for_entity(crate::services::AUDIT_ENTITY, &id.to_string())
        .await?;

    let items = entries
        .into_iter()
        .map(|entry| HistoryEntry {
            action: entry.action,
            user_email: entry.reviewer_email,
            timestamp: entry.created_at,
            details: serde_json::from_str(&entry.details).unwrap_or_else(|_| json!({})),
        })
        .collect();

    Ok(Json(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registrations::test_support::sample_registration;
    use cred_core::UserRole;

    fn reviewer() -> AuthInfo {
        AuthInfo {
            user_id: Uuid::new_v4(),
            email: "ana@rede.com.br".to_string(),
            name: "Ana".to_string(),
            role: UserRole::Reviewer,
        }
    }

    #[test]
    fn list_query_parses_filters() {
        let query = ListQuery {
            status: Some("APPROVED".to_string()),
            person_type: Some("pj".to_string()),
            ordering: Some("-full_name".to_string()),
            ..ListQuery::default()
        };
        let (status, person_type, order) = query.parse().unwrap();
        assert_eq!(status, Some(RegistrationStatus::Approved));
        assert_eq!(person_type, Some(cred_db::PersonType::Pj));
        assert_eq!(order, RegistrationOrder::NameDesc);
    }

    #[test]
    fn list_query_rejects_unknown_values() {
        let query = ListQuery {
            status: Some("FROZEN".to_string()),
            ..ListQuery::default()
        };
        assert!(query.parse().is_err());

        let query = ListQuery {
            ordering: Some("email".to_string()),
            ..ListQuery::default()
        };
        assert!(query.parse().is_err());
    }

    #[test]
    fn unknown_status_in_patch_is_a_violation() {
        let body = UpdateRegistrationRequest {
            status: Some("ON_HOLD".to_string()),
            ..UpdateRegistrationRequest::default()
        };
        assert!(validate_patch(&body).is_err());

        let body = UpdateRegistrationRequest {
            status: Some("APPROVED".to_string()),
            ..UpdateRegistrationRequest::default()
        };
        assert!(validate_patch(&body).is_ok());
    }

    #[test]
    fn approval_stamps_reviewer_once() {
        let current = sample_registration();
        let auth = reviewer();
        let now = Utc::now();
        let body = UpdateRegistrationRequest {
            status: Some("APPROVED".to_string()),
            ..UpdateRegistrationRequest::default()
        };

        let merged = merge(&current, &body, &auth, now);
        assert!(merged.status_changed);
        assert_eq!(merged.approved_by, Some(auth.user_id));
        assert_eq!(merged.approved_at, Some(now));
        assert!(merged.rejected_by.is_none());
    }

    #[test]
    fn existing_stamps_are_never_overwritten() {
        let mut current = sample_registration();
        let first_reviewer = Uuid::new_v4();
        let first_decision = Utc::now() - chrono::Duration::days(3);
        current.status = RegistrationStatus::Rejected;
        current.approved_by = Some(first_reviewer);
        current.approved_at = Some(first_decision);

        let body = UpdateRegistrationRequest {
            status: Some("APPROVED".to_string()),
            ..UpdateRegistrationRequest::default()
        };
        let merged = merge(&current, &body, &reviewer(), Utc::now());

        assert_eq!(merged.status, RegistrationStatus::Approved);
        assert_eq!(merged.approved_by, Some(first_reviewer));
        assert_eq!(merged.approved_at, Some(first_decision));
    }

    #[test]
    fn rejection_after_approval_is_allowed() {
        let mut current = sample_registration();
        current.status = RegistrationStatus::Approved;
        current.approved_by = Some(Uuid::new_v4());
        current.approved_at = Some(Utc::now());

        let auth = reviewer();
        let body = UpdateRegistrationRequest {
            status: Some("REJECTED".to_string()),
            ..UpdateRegistrationRequest::default()
        };
        let merged = merge(&current, &body, &auth, Utc::now());

        assert!(merged.status_changed);
        assert_eq!(merged.rejected_by, Some(auth.user_id));
    }

    #[test]
    fn changed_fields_are_tracked() {
        let current = sample_registration();
        let body = UpdateRegistrationRequest {
            phone: Some("11888888888".to_string()),
            city: Some(current.city.clone()),
            internal_notes: Some("documentos ok".to_string()),
            ..UpdateRegistrationRequest::default()
        };

        let merged = merge(&current, &body, &reviewer(), Utc::now());
        assert!(!merged.status_changed);
        assert_eq!(merged.changed_fields, vec!["phone", "internal_notes"]);
    }

    #[test]
    fn same_status_is_not_a_change() {
        let current = sample_registration();
        let body = UpdateRegistrationRequest {
            status: Some("PENDING".to_string()),
            ..UpdateRegistrationRequest::default()
        };
        let merged = merge(&current, &body, &reviewer(), Utc::now());
        assert!(!merged.status_changed);
        assert!(merged.changed_fields.is_empty());
    }
}
