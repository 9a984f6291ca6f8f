//! CSV exports of the registration queue.

use axum::extract::{Extension, Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use cred_core::{AppError, AuthInfo, OptionStrExt, ResultExt};
use cred_db::{AuditAction, Registration, RegistrationFilter};
use http::header;
use serde_json::json;
use uuid::Uuid;

use super::review::ListQuery;
use crate::services::record_audit;
use crate::startup::AppState;

/// Column headers, in the order the credentialing team's spreadsheets
/// expect.
const HEADERS: [&str; 28] = [
    "Data de Cadastro",
    "Status",
    "Tipo de Pessoa",
    "Nome Completo",
    "Nome Fantasia",
    "CPF",
    "CNPJ",
    "Responsável Técnico",
    "CPF do Responsável",
    "E-mail",
    "Telefone",
    "Data de Nascimento",
    "CEP",
    "Logradouro",
    "Número",
    "Complemento",
    "Bairro",
    "Cidade",
    "Estado",
    "Formação",
    "Instituição",
    "Ano de Conclusão",
    "Conselho",
    "Número do Conselho",
    "Especialidade",
    "Anos de Experiência",
    "Área de Atuação",
    "Data do Consentimento",
];

/// `GET /api/registrations/export` — CSV of the filtered queue.
pub async fn export_all(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let (status, person_type, order) = query.parse()?;

    // Same filter as the list endpoint, never paginated.
    let filter = RegistrationFilter {
        status,
        education: query.education.as_deref(),
        person_type,
        search: query.search.as_deref(),
        order,
        limit: None,
        offset: None,
    };
    let rows = state.db.registrations.list(filter).await?;
    let count = rows.len();

    let body = write_csv(&rows)?;
    let filename = format!("registrations_{}.csv", Utc::now().format("%Y%m%d"));

    record_audit(
        &state.db,
        Some(auth.user_id),
        AuditAction::View,
        "registrations",
        &json!({ "export": "csv", "count": count }),
    )
    .await;

    Ok(csv_response(body, &filename))
}

/// `GET /api/registrations/{id}/export` — single-row CSV.
pub async fn export_one(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state.db.registrations.get(id).await?;

    let body = write_csv(std::slice::from_ref(&registration))?;
    let filename = format!(
        "registration_{}_{}_{}.csv",
        slug(&registration.name),
        registration.tax_id().unwrap_or("sem_documento"),
        Utc::now().format("%Y%m%d")
    );

    record_audit(
        &state.db,
        Some(auth.user_id),
        AuditAction::View,
        &id.to_string(),
        &json!({ "export": "csv" }),
    )
    .await;

    Ok(csv_response(body, &filename))
}

fn write_csv(rows: &[Registration]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADERS)
        .internal("Failed to write CSV header")?;
    for registration in rows {
        writer
            .write_record(row(registration))
            .internal("Failed to write CSV row")?;
    }
    writer
        .into_inner()
        .internal("Failed to finish CSV document")
}

/// One CSV record, with `-` for empty optionals and pt-BR labels.
fn row(r: &Registration) -> [String; 28] {
    [
        date_time(Some(r.submitted_at)),
        r.status.label().to_string(),
        r.person_type.label().to_string(),
        r.name.clone(),
        r.company_name.clone().or_str("-"),
        r.cpf.clone().or_str("-"),
        r.cnpj.clone().or_str("-"),
        r.technical_manager_name.clone().or_str("-"),
        r.technical_manager_cpf.clone().or_str("-"),
        r.email.clone(),
        r.phone.clone(),
        date(r.birth_date),
        r.zip_code.clone(),
        r.street.clone(),
        r.number.clone(),
        r.complement.clone().or_str("-"),
        r.neighborhood.clone(),
        r.city.clone(),
        r.state.clone(),
        r.education.clone(),
        r.institution.clone(),
        number(r.graduation_year),
        r.council_name.clone(),
        r.council_number.clone(),
        r.specialty.clone().or_str("-"),
        number(r.experience_years),
        r.area_of_action.clone().or_str("-"),
        date_time(r.consent_date),
    ]
}

fn date(value: Option<NaiveDate>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string())
}

fn date_time(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string())
}

fn number(value: Option<i32>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// Filename-safe slug: lowercased, spaces to underscores, everything
/// else non-alphanumeric dropped.
fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .collect()
}

fn csv_response(body: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::registrations::test_support::sample_registration;
    use cred_db::{PersonType, RegistrationStatus};

    #[test]
    fn header_and_row_have_matching_widths() {
        let r = sample_registration();
        assert_eq!(HEADERS.len(), row(&r).len());
    }

    #[test]
    fn row_renders_labels_dates_and_placeholders() {
        let mut r = sample_registration();
        r.status = RegistrationStatus::Approved;
        r.company_name = None;
        r.birth_date = NaiveDate::from_ymd_opt(1990, 5, 20);

        let record = row(&r);
        assert_eq!(record[0], r.submitted_at.format("%d/%m/%Y").to_string());
        assert_eq!(record[1], "Aprovado");
        assert_eq!(record[2], "Pessoa Física");
        assert_eq!(record[4], "-");
        assert_eq!(record[11], "20/05/1990");
    }

    #[test]
    fn csv_document_is_well_formed() {
        let mut pj = sample_registration();
        pj.person_type = PersonType::Pj;
        pj.cpf = None;
        pj.cnpj = Some("12345678000199".to_string());
        pj.company_name = Some("Boa Saúde".to_string());

        let bytes = write_csv(&[sample_registration(), pj]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Data de Cadastro,Status,Tipo de Pessoa"));
        assert!(lines[2].contains("12345678000199"));
    }

    #[test]
    fn slug_drops_accents_and_keeps_words() {
        assert_eq!(slug("Maria Silva"), "maria_silva");
        assert_eq!(slug("Clínica Boa Saúde LTDA"), "clnica_boa_sade_ltda");
        assert_eq!(slug("a-b.c"), "abc");
    }
}
