//! Public registration submission.

use axum::Json;
use axum::extract::State;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use cred_core::validation::{is_valid_email, is_valid_uf, require_text};
use cred_core::{AppError, StrExt, Violations, tax_id};
use cred_db::{AuditAction, NewRegistrationParams, PersonType};
use http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::RegistrationResponse;
use crate::core::messages;
use crate::services::record_audit;
use crate::startup::AppState;

/// Cooldown before the same tax id may submit again.
const RESUBMISSION_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRegistrationRequest {
    pub person_type: Option<PersonType>,
    pub full_name: String,
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
}

/// Field values that survive validation in normalized form.
#[derive(Debug)]
struct ValidatedTaxIds {
    person_type: PersonType,
    cpf: Option<String>,
    cnpj: Option<String>,
    technical_manager_cpf: Option<String>,
}

/// `POST /api/registrations` — public intake.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let ids = validate_fields(&body)?;

    // Cross-record checks only run once the fields themselves are sane.
    let mut violations = Violations::new();
    let cutoff = Utc::now() - Duration::days(RESUBMISSION_WINDOW_DAYS);

    if let Some(cpf) = &ids.cpf {
        if state.db.registrations.recent_cpf_exists(cpf, cutoff).await? {
            violations.add(
                "cpf",
                "A registration with this CPF was already submitted in the last 90 days",
            );
        }
    }
    if let Some(cnpj) = &ids.cnpj {
        if state
            .db
            .registrations
            .recent_cnpj_exists(cnpj, cutoff)
            .await?
        {
            violations.add(
                "cnpj",
                "A registration with this CNPJ was already submitted in the last 90 days",
            );
        } else {
            // Only an ATIVA company may enter the network. Lookup
            // failures block the create rather than letting an
            // unverifiable company through.
            let lookup = state.cnpj.validate(cnpj).await;
            if !lookup.valid {
                let message = match lookup.code.as_str() {
                    "timeout" | "error" => {
                        "Não foi possível validar o CNPJ no momento. Tente novamente mais tarde."
                            .to_string()
                    }
                    _ => lookup.message,
                };
                violations.add("cnpj", message);
            }
        }
    }
    violations.finish()?;

    // Blank optional form fields arrive as empty strings; store NULL.
    let complement = body.complement.as_deref().and_then(StrExt::to_opt);
    let specialty = body.specialty.as_deref().and_then(StrExt::to_opt);
    let area_of_action = body.area_of_action.as_deref().and_then(StrExt::to_opt);

    let now = Utc::now();
    let registration = state
        .db
        .registrations
        .create(NewRegistrationParams {
            person_type: ids.person_type,
            name: body.full_name.trim(),
            company_name: body.company_name.as_deref(),
            cpf: ids.cpf.as_deref(),
            cnpj: ids.cnpj.as_deref(),
            technical_manager_name: body.technical_manager_name.as_deref(),
            technical_manager_cpf: ids.technical_manager_cpf.as_deref(),
            email: body.email.trim(),
            phone: body.phone.trim(),
            birth_date: body.birth_date,
            zip_code: body.zip_code.trim(),
            street: body.street.trim(),
            number: body.number.trim(),
            complement: complement.as_deref(),
            neighborhood: body.neighborhood.trim(),
            city: body.city.trim(),
            state: body.state.trim(),
            education: body.education.trim(),
            institution: body.institution.trim(),
            graduation_year: body.graduation_year,
            council_name: body.council_name.trim(),
            council_number: body.council_number.trim(),
            specialty: specialty.as_deref(),
            area_of_action: area_of_action.as_deref(),
            experience_years: body.experience_years,
            consent_given: body.consent_given,
            consent_date: Some(now),
        })
        .await?;

    info!(
        registration_id = %registration.id,
        person_type = %registration.person_type,
        "Registration submitted"
    );

    record_audit(
        &state.db,
        None,
        AuditAction::Create,
        &registration.id.to_string(),
        &json!({ "person_type": registration.person_type }),
    )
    .await;

    let message = messages::confirmation(&registration);
    if let Err(e) = state.email.send(&message).await {
        warn!(
            registration_id = %registration.id,
            provider = state.email.name(),
            error = %e,
            "Confirmation email failed"
        );
    }

    Ok((StatusCode::CREATED, Json(registration.into())))
}

/// Field-level validation. Reports every violation at once.
fn validate_fields(body: &CreateRegistrationRequest) -> Result<ValidatedTaxIds, AppError> {
    let mut violations = Violations::new();

    require_text(&mut violations, "full_name", &body.full_name);
    require_text(&mut violations, "phone", &body.phone);
    require_text(&mut violations, "zip_code", &body.zip_code);
    require_text(&mut violations, "street", &body.street);
    require_text(&mut violations, "number", &body.number);
    require_text(&mut violations, "neighborhood", &body.neighborhood);
    require_text(&mut violations, "city", &body.city);
    require_text(&mut violations, "education", &body.education);
    require_text(&mut violations, "institution", &body.institution);
    require_text(&mut violations, "council_name", &body.council_name);
    require_text(&mut violations, "council_number", &body.council_number);

    if !is_valid_email(body.email.trim()) {
        violations.add("email", "Must be a valid email address");
    }
    if !is_valid_uf(body.state.trim()) {
        violations.add("state", "Must be a two-letter UF code");
    }
    if !body.consent_given {
        violations.add("consent_given", "Consent is required to submit a registration");
    }

    let current_year = Utc::now().year();
    if let Some(year) = body.graduation_year {
        if year < 1900 || year > current_year + 1 {
            violations.add("graduation_year", "Must be a plausible year");
        }
    }
    if let Some(years) = body.experience_years {
        if !(0..=80).contains(&years) {
            violations.add("experience_years", "Must be between 0 and 80");
        }
    }

    let cpf = body.cpf.as_deref().map(tax_id::digits).filter(|d| !d.is_empty());
    let cnpj = body.cnpj.as_deref().map(tax_id::digits).filter(|d| !d.is_empty());
    let manager_cpf = body
        .technical_manager_cpf
        .as_deref()
        .map(tax_id::digits)
        .filter(|d| !d.is_empty());

    let Some(person_type) = body.person_type else {
        violations.add("person_type", "This field is required");
        return Err(violations
            .finish()
            .err()
            .unwrap_or_else(|| AppError::invalid("person_type", "This field is required")));
    };

    match person_type {
        PersonType::Pf => {
            match &cpf {
                Some(digits) if tax_id::is_cpf(digits) => {}
                Some(_) => violations.add("cpf", "CPF must contain 11 digits"),
                None => violations.add("cpf", "This field is required for PF"),
            }
            if cnpj.is_some() {
                violations.add("cnpj", "Must be absent for PF registrations");
            }
        }
        PersonType::Pj => {
            match &cnpj {
                Some(digits) if tax_id::is_cnpj(digits) => {}
                Some(_) => violations.add("cnpj", "CNPJ must contain 14 digits"),
                None => violations.add("cnpj", "This field is required for PJ"),
            }
            if cpf.is_some() {
                violations.add("cpf", "Must be absent for PJ registrations");
            }
            if body
                .company_name
                .as_deref()
                .is_none_or_empty()
            {
                violations.add("company_name", "This field is required for PJ");
            }
            if body
                .technical_manager_name
                .as_deref()
                .is_none_or_empty()
            {
                violations.add("technical_manager_name", "This field is required for PJ");
            }
            match &manager_cpf {
                Some(digits) if tax_id::is_cpf(digits) => {}
                Some(_) => violations.add("technical_manager_cpf", "CPF must contain 11 digits"),
                None => violations.add("technical_manager_cpf", "This field is required for PJ"),
            }
        }
    }

    violations.finish()?;

    Ok(match person_type {
        PersonType::Pf => ValidatedTaxIds {
            person_type,
            cpf,
            cnpj: None,
            technical_manager_cpf: None,
        },
        PersonType::Pj => ValidatedTaxIds {
            person_type,
            cpf: None,
            cnpj,
            technical_manager_cpf: manager_cpf,
        },
    })
}

/// Blank-or-missing check for conditionally required fields.
trait OptStrCheck {
    fn is_none_or_empty(&self) -> bool;
}

impl OptStrCheck for Option<&str> {
    fn is_none_or_empty(&self) -> bool {
        self.map_or(true, |s| s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cred_core::FieldViolation;

    fn violation_fields(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(items) => {
                items.into_iter().map(|FieldViolation { field, .. }| field).collect()
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn valid_pf_request() -> CreateRegistrationRequest {
        CreateRegistrationRequest {
            person_type: Some(PersonType::Pf),
            full_name: "Maria Silva".to_string(),
            cpf: Some("123.456.789-01".to_string()),
            email: "maria@example.com".to_string(),
            phone: "11999999999".to_string(),
            zip_code: "01310100".to_string(),
            street: "Av. Paulista".to_string(),
            number: "1000".to_string(),
            neighborhood: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            education: "Enfermagem".to_string(),
            institution: "USP".to_string(),
            graduation_year: Some(2018),
            council_name: "COREN".to_string(),
            council_number: "123456".to_string(),
            experience_years: Some(5),
            consent_given: true,
            ..CreateRegistrationRequest::default()
        }
    }

    fn valid_pj_request() -> CreateRegistrationRequest {
        CreateRegistrationRequest {
            person_type: Some(PersonType::Pj),
            full_name: "Clínica Boa Saúde LTDA".to_string(),
            company_name: Some("Boa Saúde".to_string()),
            cnpj: Some("12.345.678/0001-99".to_string()),
            technical_manager_name: Some("João Souza".to_string()),
            technical_manager_cpf: Some("98765432100".to_string()),
            cpf: None,
            ..valid_pf_request()
        }
    }

    #[test]
    fn valid_pf_passes_and_normalizes_the_cpf() {
        let ids = validate_fields(&valid_pf_request()).unwrap();
        assert_eq!(ids.cpf.as_deref(), Some("12345678901"));
        assert!(ids.cnpj.is_none());
    }

    #[test]
    fn valid_pj_passes_and_normalizes_both_tax_ids() {
        let ids = validate_fields(&valid_pj_request()).unwrap();
        assert_eq!(ids.cnpj.as_deref(), Some("12345678000199"));
        assert_eq!(ids.technical_manager_cpf.as_deref(), Some("98765432100"));
        assert!(ids.cpf.is_none());
    }

    #[test]
    fn pf_requires_cpf_and_forbids_cnpj() {
        let mut req = valid_pf_request();
        req.cpf = None;
        req.cnpj = Some("12345678000199".to_string());

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert!(fields.contains(&"cpf".to_string()));
        assert!(fields.contains(&"cnpj".to_string()));
    }

    #[test]
    fn pj_requires_company_and_technical_manager() {
        let mut req = valid_pj_request();
        req.company_name = Some("  ".to_string());
        req.technical_manager_name = None;
        req.technical_manager_cpf = Some("123".to_string());

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert!(fields.contains(&"company_name".to_string()));
        assert!(fields.contains(&"technical_manager_name".to_string()));
        assert!(fields.contains(&"technical_manager_cpf".to_string()));
    }

    #[test]
    fn consent_is_mandatory() {
        let mut req = valid_pf_request();
        req.consent_given = false;

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert_eq!(fields, vec!["consent_given".to_string()]);
    }

    #[test]
    fn short_cpf_is_rejected() {
        let mut req = valid_pf_request();
        req.cpf = Some("123".to_string());

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert_eq!(fields, vec!["cpf".to_string()]);
    }

    #[test]
    fn all_violations_reported_together() {
        let req = CreateRegistrationRequest {
            person_type: Some(PersonType::Pf),
            consent_given: true,
            ..CreateRegistrationRequest::default()
        };

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert!(fields.len() > 5);
        assert!(fields.contains(&"full_name".to_string()));
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"state".to_string()));
    }

    #[test]
    fn missing_person_type_short_circuits() {
        let req = CreateRegistrationRequest::default();
        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert!(fields.contains(&"person_type".to_string()));
    }

    #[test]
    fn implausible_years_are_rejected() {
        let mut req = valid_pf_request();
        req.graduation_year = Some(1850);
        req.experience_years = Some(120);

        let fields = violation_fields(validate_fields(&req).unwrap_err());
        assert!(fields.contains(&"graduation_year".to_string()));
        assert!(fields.contains(&"experience_years".to_string()));
    }
}
