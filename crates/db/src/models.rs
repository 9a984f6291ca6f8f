//! Database models and parameter types for the credentialing schema.

use chrono::{DateTime, NaiveDate, Utc};
use cred_core::JwtSubject;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Person type enum matching `PostgreSQL` `person_type`.
///
/// `Pf` is an individual provider (natural person, identified by CPF),
/// `Pj` a company (legal entity, identified by CNPJ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "person_type", rename_all = "lowercase")]
#[serde(rename_all = "UPPERCASE")]
pub enum PersonType {
    Pf,
    Pj,
}

impl PersonType {
    /// Returns the string representation as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pf => "pf",
            Self::Pj => "pj",
        }
    }

    /// Human-readable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pf => "Pessoa Física",
            Self::Pj => "Pessoa Jurídica",
        }
    }
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PersonType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pf" => Ok(Self::Pf),
            "pj" => Ok(Self::Pj),
            other => Err(format!("Unknown person type: {other}")),
        }
    }
}

/// Registration status enum matching `PostgreSQL` `registration_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "registration_status", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    AdjustmentRequested,
}

impl RegistrationStatus {
    /// Returns the string representation as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::AdjustmentRequested => "adjustment_requested",
        }
    }

    /// Human-readable label used in notification emails and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendente",
            Self::Approved => "Aprovado",
            Self::Rejected => "Reprovado",
            Self::AdjustmentRequested => "Ajuste Solicitado",
        }
    }

    /// Whether this status marks the end of an analysis.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "adjustment_requested" => Ok(Self::AdjustmentRequested),
            other => Err(format!("Unknown registration status: {other}")),
        }
    }
}

/// Audit action enum matching `PostgreSQL` `audit_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    StatusChange,
}

impl AuditAction {
    /// Returns the string representation as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::View => "view",
            Self::StatusChange => "status_change",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer role enum matching `PostgreSQL` `reviewer_role`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reviewer_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewerRole {
    Administrator,
    #[default]
    Reviewer,
}

impl ReviewerRole {
    /// Returns the string representation as stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Reviewer => "reviewer",
        }
    }
}

impl std::fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Database models
// =============================================================================

/// Back-office reviewer account from `reviewers`.
#[derive(Debug, Clone, FromRow)]
pub struct Reviewer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: ReviewerRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Implements [`JwtSubject`] for `Reviewer` to enable JWT generation.
impl JwtSubject for Reviewer {
    fn user_id(&self) -> Uuid {
        self.id
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &str {
        self.role.as_str()
    }
}

/// Credentialing registration from `registrations`.
///
/// PF rows fill `cpf` and leave the company fields null; PJ rows fill
/// `cnpj`, `company_name` and the technical manager fields instead.
/// `birth_date` doubles as the company opening date for PJ.
#[derive(Debug, Clone, FromRow)]
pub struct Registration {
    pub id: Uuid,
    pub person_type: PersonType,
    pub status: RegistrationStatus,
    pub name: String,
    pub company_name: Option<String>,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
    pub technical_manager_name: Option<String>,
    pub technical_manager_cpf: Option<String>,
    pub email: String,
    pub phone: String,
    pub birth_date: Option<NaiveDate>,
    pub zip_code: String,
    pub street: String,
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub education: String,
    pub institution: String,
    pub graduation_year: Option<i32>,
    pub council_name: String,
    pub council_number: String,
    pub specialty: Option<String>,
    pub area_of_action: Option<String>,
    pub experience_years: Option<i32>,
    pub consent_given: bool,
    pub consent_date: Option<DateTime<Utc>>,
    pub internal_notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// The tax identifier for the registration's person type, if present.
    #[must_use]
    pub fn tax_id(&self) -> Option<&str> {
        match self.person_type {
            PersonType::Pf => self.cpf.as_deref(),
            PersonType::Pj => self.cnpj.as_deref(),
        }
    }

    /// Decision timestamp, preferring approval over rejection.
    #[must_use]
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at.or(self.rejected_at)
    }

    /// Reviewer who made the decision, preferring approval over rejection.
    #[must_use]
    pub fn decided_by(&self) -> Option<Uuid> {
        self.approved_by.or(self.rejected_by)
    }
}

/// Uploaded document from `documents`.
#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub doc_type: String,
    pub file_name: String,
    pub file_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Audit trail entry from `audit_log`, with the reviewer
/// name and email joined in for display.
#[derive(Debug, Clone, FromRow)]
pub struct AuditEntry {
    pub id: Uuid,
    pub reviewer_id: Option<Uuid>,
    pub reviewer_name: Option<String>,
    pub reviewer_email: Option<String>,
    pub action: AuditAction,
    pub entity: String,
    pub entity_id: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Parameter types
// =============================================================================

/// Parameters for creating a registration.
#[derive(Debug, Clone, Copy)]
pub struct NewRegistrationParams<'a> {
    pub person_type: PersonType,
    pub name: &'a str,
    pub company_name: Option<&'a str>,
    pub cpf: Option<&'a str>,
    pub cnpj: Option<&'a str>,
    pub technical_manager_name: Option<&'a str>,
    pub technical_manager_cpf: Option<&'a str>,
    pub email: &'a str,
    pub phone: &'a str,
    pub birth_date: Option<NaiveDate>,
    pub zip_code: &'a str,
    pub street: &'a str,
    pub number: &'a str,
    pub complement: Option<&'a str>,
    pub neighborhood: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub education: &'a str,
    pub institution: &'a str,
    pub graduation_year: Option<i32>,
    pub council_name: &'a str,
    pub council_number: &'a str,
    pub specialty: Option<&'a str>,
    pub area_of_action: Option<&'a str>,
    pub experience_years: Option<i32>,
    pub consent_given: bool,
    pub consent_date: Option<DateTime<Utc>>,
}

/// Parameters for updating a registration.
///
/// Carries the full post-merge column values; partial-update semantics
/// are resolved by the caller before reaching the database.
#[derive(Debug, Clone, Copy)]
pub struct UpdateRegistrationParams<'a> {
    pub id: Uuid,
    pub status: RegistrationStatus,
    pub name: &'a str,
    pub company_name: Option<&'a str>,
    pub technical_manager_name: Option<&'a str>,
    pub technical_manager_cpf: Option<&'a str>,
    pub email: &'a str,
    pub phone: &'a str,
    pub birth_date: Option<NaiveDate>,
    pub zip_code: &'a str,
    pub street: &'a str,
    pub number: &'a str,
    pub complement: Option<&'a str>,
    pub neighborhood: &'a str,
    pub city: &'a str,
    pub state: &'a str,
    pub education: &'a str,
    pub institution: &'a str,
    pub graduation_year: Option<i32>,
    pub council_name: &'a str,
    pub council_number: &'a str,
    pub specialty: Option<&'a str>,
    pub area_of_action: Option<&'a str>,
    pub experience_years: Option<i32>,
    pub internal_notes: Option<&'a str>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Sort order for registration listings.
///
/// Parsed from the `ordering` query parameter; a leading `-` flips the
/// direction, mirroring the convention the admin frontend already uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationOrder {
    #[default]
    SubmittedAtDesc,
    SubmittedAtAsc,
    NameAsc,
    NameDesc,
}

impl RegistrationOrder {
    /// ORDER BY fragment for this ordering. Values are fixed at compile
    /// time, never interpolated from user input.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::SubmittedAtDesc => "submitted_at DESC",
            Self::SubmittedAtAsc => "submitted_at ASC",
            Self::NameAsc => "name ASC",
            Self::NameDesc => "name DESC",
        }
    }
}

impl std::str::FromStr for RegistrationOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accepts both the API names (submission_date, full_name) and the
        // column names, since the admin frontend has used both over time.
        match s {
            "submitted_at" | "submission_date" => Ok(Self::SubmittedAtAsc),
            "-submitted_at" | "-submission_date" => Ok(Self::SubmittedAtDesc),
            "name" | "full_name" => Ok(Self::NameAsc),
            "-name" | "-full_name" => Ok(Self::NameDesc),
            other => Err(format!("Unknown ordering: {other}")),
        }
    }
}

/// Filter, ordering and pagination for registration listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationFilter<'a> {
    pub status: Option<RegistrationStatus>,
    pub education: Option<&'a str>,
    pub person_type: Option<PersonType>,
    /// Substring match over name, company name, email, CPF and CNPJ.
    /// LIKE wildcards in the term are treated literally.
    pub search: Option<&'a str>,
    pub order: RegistrationOrder,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parameters for creating a document record.
#[derive(Debug, Clone, Copy)]
pub struct NewDocumentParams<'a> {
    pub registration_id: Uuid,
    pub doc_type: &'a str,
    pub file_name: &'a str,
    pub file_key: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
}

/// Parameters for recording an audit trail entry.
#[derive(Debug, Clone, Copy)]
pub struct NewAuditEntryParams<'a> {
    pub reviewer_id: Option<Uuid>,
    pub action: AuditAction,
    pub entity: &'a str,
    pub entity_id: &'a str,
    pub details: &'a str,
}

/// Parameters for creating a reviewer account.
#[derive(Debug, Clone, Copy)]
pub struct NewReviewerParams<'a> {
    pub name: &'a str,
    pub email: &'a str,
    /// Argon2 hash, never the plain password.
    pub password_hash: &'a str,
    pub role: ReviewerRole,
}

// =============================================================================
// Dashboard read models
// =============================================================================

/// Registration volume counters for the dashboard.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct VolumeCounts {
    pub total: i64,
    pub last_30_days: i64,
    pub last_60_days: i64,
    pub last_90_days: i64,
}

/// Per-status registration count. Only statuses with at least one row
/// are reported.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct StatusCount {
    pub status: RegistrationStatus,
    pub count: i64,
}

/// Monthly submission count for the trailing-year trend.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct MonthlyCount {
    pub month: DateTime<Utc>,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn person_type_round_trip() {
        assert_eq!(PersonType::Pf.as_str(), "pf");
        assert_eq!(PersonType::Pj.as_str(), "pj");
        assert_eq!(PersonType::from_str("PF").unwrap(), PersonType::Pf);
        assert_eq!(PersonType::from_str("pj").unwrap(), PersonType::Pj);
        assert!(PersonType::from_str("px").is_err());
    }

    #[test]
    fn person_type_labels() {
        assert_eq!(PersonType::Pf.label(), "Pessoa Física");
        assert_eq!(PersonType::Pj.label(), "Pessoa Jurídica");
    }

    #[test]
    fn person_type_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&PersonType::Pf).unwrap(), "\"PF\"");
        let parsed: PersonType = serde_json::from_str("\"PJ\"").unwrap();
        assert_eq!(parsed, PersonType::Pj);
    }

    #[test]
    fn status_wire_format_is_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&RegistrationStatus::AdjustmentRequested).unwrap(),
            "\"ADJUSTMENT_REQUESTED\""
        );
        let parsed: RegistrationStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(parsed, RegistrationStatus::Approved);
    }

    #[test]
    fn status_labels() {
        assert_eq!(RegistrationStatus::Pending.label(), "Pendente");
        assert_eq!(RegistrationStatus::Approved.label(), "Aprovado");
        assert_eq!(RegistrationStatus::Rejected.label(), "Reprovado");
        assert_eq!(
            RegistrationStatus::AdjustmentRequested.label(),
            "Ajuste Solicitado"
        );
    }

    #[test]
    fn status_from_str_accepts_wire_and_db_forms() {
        assert_eq!(
            RegistrationStatus::from_str("PENDING").unwrap(),
            RegistrationStatus::Pending
        );
        assert_eq!(
            RegistrationStatus::from_str("adjustment_requested").unwrap(),
            RegistrationStatus::AdjustmentRequested
        );
        assert!(RegistrationStatus::from_str("UNKNOWN").is_err());
    }

    #[test]
    fn only_decision_statuses_are_final() {
        assert!(RegistrationStatus::Approved.is_final());
        assert!(RegistrationStatus::Rejected.is_final());
        assert!(!RegistrationStatus::Pending.is_final());
        assert!(!RegistrationStatus::AdjustmentRequested.is_final());
    }

    #[test]
    fn audit_action_db_form() {
        assert_eq!(AuditAction::StatusChange.as_str(), "status_change");
        assert_eq!(
            serde_json::to_string(&AuditAction::StatusChange).unwrap(),
            "\"STATUS_CHANGE\""
        );
    }

    #[test]
    fn ordering_parses_direction_prefix() {
        assert_eq!(
            RegistrationOrder::from_str("-submitted_at").unwrap(),
            RegistrationOrder::SubmittedAtDesc
        );
        assert_eq!(
            RegistrationOrder::from_str("name").unwrap(),
            RegistrationOrder::NameAsc
        );
        assert!(RegistrationOrder::from_str("email").is_err());
    }

    #[test]
    fn ordering_accepts_api_field_names() {
        assert_eq!(
            RegistrationOrder::from_str("-submission_date").unwrap(),
            RegistrationOrder::SubmittedAtDesc
        );
        assert_eq!(
            RegistrationOrder::from_str("full_name").unwrap(),
            RegistrationOrder::NameAsc
        );
        assert_eq!(
            RegistrationOrder::from_str("-full_name").unwrap(),
            RegistrationOrder::NameDesc
        );
    }

    #[test]
    fn registration_tax_id_follows_person_type() {
        let mut reg = sample_registration();
        assert_eq!(reg.tax_id(), Some("12345678901"));

        reg.person_type = PersonType::Pj;
        reg.cnpj = Some("12345678000199".to_string());
        assert_eq!(reg.tax_id(), Some("12345678000199"));
    }

    #[test]
    fn decision_prefers_approval() {
        let mut reg = sample_registration();
        assert_eq!(reg.decided_at(), None);

        let when = Utc::now();
        reg.rejected_at = Some(when);
        assert_eq!(reg.decided_at(), Some(when));

        let earlier = when - chrono::Duration::days(1);
        reg.approved_at = Some(earlier);
        assert_eq!(reg.decided_at(), Some(earlier));
    }

    fn sample_registration() -> Registration {
        Registration {
            id: Uuid::new_v4(),
            person_type: PersonType::Pf,
            status: RegistrationStatus::Pending,
            name: "Maria Silva".to_string(),
            company_name: None,
            cpf: Some("12345678901".to_string()),
            cnpj: None,
            technical_manager_name: None,
            technical_manager_cpf: None,
            email: "maria@example.com".to_string(),
            phone: "11999999999".to_string(),
            birth_date: None,
            zip_code: "01310100".to_string(),
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            complement: None,
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            education: "Enfermagem".to_string(),
            institution: "USP".to_string(),
            graduation_year: Some(2018),
            council_name: "COREN".to_string(),
            council_number: "123456".to_string(),
            specialty: None,
            area_of_action: None,
            experience_years: Some(5),
            consent_given: true,
            consent_date: Some(Utc::now()),
            internal_notes: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
