//! Registration intake and review endpoints.
//!
//! `intake` is the public submission surface, `review` the
//! authenticated reviewer workflow, `export` the CSV reports.

mod export;
mod intake;
mod review;

pub use export::{export_all, export_one};
pub use intake::create;
pub use review::{delete, get, history, list, update};

use chrono::{DateTime, NaiveDate, Utc};
use cred_db::{PersonType, Registration, RegistrationStatus};
use serde::Serialize;
use uuid::Uuid;

/// Reviewer-facing registration representation.
///
/// The API field names differ from the columns in two places that
/// predate this service: `full_name` and the `submission_date` /
/// `last_status_update` timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub id: Uuid,
    pub person_type: PersonType,
    pub status: RegistrationStatus,
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
    pub consent_date: Option<DateTime<Utc>>,
    pub internal_notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub submission_date: DateTime<Utc>,
    pub last_status_update: DateTime<Utc>,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            person_type: r.person_type,
            status: r.status,
            full_name: r.name,
            company_name: r.company_name,
            cpf: r.cpf,
            cnpj: r.cnpj,
            technical_manager_name: r.technical_manager_name,
            technical_manager_cpf: r.technical_manager_cpf,
            email: r.email,
            phone: r.phone,
            birth_date: r.birth_date,
            zip_code: r.zip_code,
            street: r.street,
            number: r.number,
            complement: r.complement,
            neighborhood: r.neighborhood,
            city: r.city,
            state: r.state,
            education: r.education,
            institution: r.institution,
            graduation_year: r.graduation_year,
            council_name: r.council_name,
            council_number: r.council_number,
            specialty: r.specialty,
            area_of_action: r.area_of_action,
            experience_years: r.experience_years,
            consent_given: r.consent_given,
            consent_date: r.consent_date,
            internal_notes: r.internal_notes,
            approved_by: r.approved_by,
            approved_at: r.approved_at,
            rejected_by: r.rejected_by,
            rejected_at: r.rejected_at,
            submission_date: r.submitted_at,
            last_status_update: r.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_renames_the_timestamp_fields() {
        let reg = test_support::sample_registration();
        let submitted = reg.submitted_at;
        let json = serde_json::to_value(RegistrationResponse::from(reg)).unwrap();

        assert_eq!(json["full_name"], "Maria Silva");
        assert!(json.get("name").is_none());
        assert!(json.get("submitted_at").is_none());
        assert_eq!(
            json["submission_date"],
            serde_json::to_value(submitted).unwrap()
        );
        assert_eq!(json["status"], "PENDING");
        assert_eq!(json["person_type"], "PF");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn sample_registration() -> Registration {
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
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20),
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
