//! Notification message assembly.
//!
//! Bridges registrations to the rendered pt-BR templates. Tax ids are
//! masked here, before they reach any template or provider.

use cred_core::tax_id::{mask_cnpj, mask_cpf};
use cred_db::{PersonType, Registration, RegistrationStatus};
use cred_email::{RegistrationConfirmationEmail, StatusUpdateEmail};

use super::email_provider::EmailMessage;

/// "CPF"/"CNPJ" label and masked value for a registration.
fn masked_tax_id(registration: &Registration) -> (&'static str, String) {
    match registration.person_type {
        PersonType::Pf => (
            "CPF",
            mask_cpf(registration.cpf.as_deref().unwrap_or_default()),
        ),
        PersonType::Pj => (
            "CNPJ",
            mask_cnpj(registration.cnpj.as_deref().unwrap_or_default()),
        ),
    }
}

/// Submission confirmation for the applicant.
#[must_use]
pub fn confirmation(registration: &Registration) -> EmailMessage {
    let (tax_id_label, masked) = masked_tax_id(registration);
    let template = RegistrationConfirmationEmail {
        name: &registration.name,
        tax_id_label,
        masked_tax_id: &masked,
    };

    EmailMessage {
        to_email: registration.email.clone(),
        to_name: registration.name.clone(),
        subject: template.subject().to_string(),
        html: template.render_html(),
        text: template.render_text(),
    }
}

/// Status change notification for the applicant.
#[must_use]
pub fn status_update(registration: &Registration, status: RegistrationStatus) -> EmailMessage {
    let (tax_id_label, masked) = masked_tax_id(registration);
    let template = StatusUpdateEmail {
        name: &registration.name,
        status_label: status.label(),
        tax_id_label,
        masked_tax_id: &masked,
        adjustment_requested: status == RegistrationStatus::AdjustmentRequested,
    };

    EmailMessage {
        to_email: registration.email.clone(),
        to_name: registration.name.clone(),
        subject: template.subject(),
        html: template.render_html(),
        text: template.render_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn pf_registration() -> Registration {
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

    #[test]
    fn confirmation_masks_the_cpf() {
        let message = confirmation(&pf_registration());

        assert_eq!(message.to_email, "maria@example.com");
        assert_eq!(message.subject, "Confirmação de Cadastro - Credenciamento");
        assert!(message.text.contains("CPF: 123.***.***"));
        assert!(!message.text.contains("12345678901"));
        assert!(!message.html.contains("12345678901"));
    }

    #[test]
    fn status_update_for_company_masks_the_cnpj() {
        let mut registration = pf_registration();
        registration.person_type = PersonType::Pj;
        registration.cpf = None;
        registration.cnpj = Some("12345678000199".to_string());

        let message = status_update(&registration, RegistrationStatus::Approved);

        assert_eq!(
            message.subject,
            "Atualização de Status - Credenciamento: Aprovado"
        );
        assert!(message.text.contains("CNPJ: 12.***.***"));
        assert!(!message.text.contains("12345678000199"));
    }

    #[test]
    fn adjustment_request_gets_the_follow_up_line() {
        let message = status_update(
            &pf_registration(),
            RegistrationStatus::AdjustmentRequested,
        );
        assert!(message.text.contains("Fique atento ao seu e-mail"));
    }
}
