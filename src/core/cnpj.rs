//! CNPJ lookups against the public registry API.
//!
//! Companies can only be credentialed while their registry situation is
//! "ATIVA", so PJ intake consults the registry before accepting a
//! submission. The frontend also calls the lookup endpoint directly for
//! inline form feedback.

use std::time::Duration;

use cred_core::tax_id::digits;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ACTIVE_SITUATION: &str = "ATIVA";

/// Registry lookup outcome. Serialized as-is on the lookup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CnpjValidation {
    pub valid: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub situation: Option<String>,
}

impl CnpjValidation {
    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            code: code.to_string(),
            message: message.into(),
            company_name: None,
            situation: None,
        }
    }
}

/// Relevant fields of the registry response.
#[derive(Debug, Deserialize)]
struct RegistryRecord {
    #[serde(default)]
    razao_social: Option<String>,
    #[serde(default)]
    descricao_situacao_cadastral: Option<String>,
}

/// HTTP client for the CNPJ registry.
#[derive(Debug, Clone)]
pub struct CnpjService {
    client: reqwest::Client,
    base_url: String,
}

impl CnpjService {
    #[must_use]
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Look up a CNPJ and classify the result.
    ///
    /// Never fails: registry outages and timeouts come back as distinct
    /// non-valid outcomes so callers can decide how strict to be.
    pub async fn validate(&self, raw: &str) -> CnpjValidation {
        let cnpj = digits(raw);
        if cnpj.len() != 14 {
            return CnpjValidation::failure("invalid_format", "CNPJ deve conter 14 dígitos");
        }

        let url = format!("{}/{cnpj}", self.base_url);
        debug!(%cnpj, "Consulting CNPJ registry");

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(%cnpj, "CNPJ registry timed out");
                return CnpjValidation::failure(
                    "timeout",
                    "Tempo de consulta esgotado. Tente novamente.",
                );
            }
            Err(e) => {
                warn!(%cnpj, error = %e, "CNPJ registry unreachable");
                return CnpjValidation::failure(
                    "error",
                    "Não foi possível consultar o CNPJ. Tente novamente.",
                );
            }
        };

        match response.status() {
            s if s.is_success() => match response.json::<RegistryRecord>().await {
                Ok(record) => Self::classify(record),
                Err(e) => {
                    warn!(%cnpj, error = %e, "CNPJ registry returned malformed body");
                    CnpjValidation::failure(
                        "error",
                        "Não foi possível consultar o CNPJ. Tente novamente.",
                    )
                }
            },
            s if s.as_u16() == 404 => {
                CnpjValidation::failure("not_found", "CNPJ não encontrado na Receita Federal")
            }
            s => {
                warn!(%cnpj, status = %s, "CNPJ registry returned an error status");
                CnpjValidation::failure(
                    "error",
                    "Não foi possível consultar o CNPJ. Tente novamente.",
                )
            }
        }
    }

    fn classify(record: RegistryRecord) -> CnpjValidation {
        let situation = record.descricao_situacao_cadastral;
        let active = situation.as_deref() == Some(ACTIVE_SITUATION);

        if active {
            CnpjValidation {
                valid: true,
                code: "valid".to_string(),
                message: "CNPJ ativo na Receita Federal".to_string(),
                company_name: record.razao_social,
                situation,
            }
        } else {
            let label = situation.as_deref().unwrap_or("desconhecida");
            CnpjValidation {
                valid: false,
                code: "invalid".to_string(),
                message: format!("Situação cadastral: {label}"),
                company_name: record.razao_social,
                situation,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn service(server: &MockServer) -> CnpjService {
        CnpjService::new(&server.base_url(), 2)
    }

    #[tokio::test]
    async fn short_input_is_rejected_without_a_lookup() {
        let server = MockServer::start_async().await;
        let result = service(&server).validate("123").await;

        assert!(!result.valid);
        assert_eq!(result.code, "invalid_format");
    }

    #[tokio::test]
    async fn active_company_is_valid() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/12345678000199");
                then.status(200).json_body(serde_json::json!({
                    "razao_social": "Clínica Boa Saúde LTDA",
                    "descricao_situacao_cadastral": "ATIVA",
                }));
            })
            .await;

        let result = service(&server).validate("12.345.678/0001-99").await;
        mock.assert_async().await;

        assert!(result.valid);
        assert_eq!(result.code, "valid");
        assert_eq!(result.company_name.as_deref(), Some("Clínica Boa Saúde LTDA"));
        assert_eq!(result.situation.as_deref(), Some("ATIVA"));
    }

    #[tokio::test]
    async fn suspended_company_is_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/12345678000199");
                then.status(200).json_body(serde_json::json!({
                    "razao_social": "Clínica Fechada LTDA",
                    "descricao_situacao_cadastral": "BAIXADA",
                }));
            })
            .await;

        let result = service(&server).validate("12345678000199").await;

        assert!(!result.valid);
        assert_eq!(result.code, "invalid");
        assert_eq!(result.message, "Situação cadastral: BAIXADA");
        assert_eq!(result.situation.as_deref(), Some("BAIXADA"));
    }

    #[tokio::test]
    async fn unknown_cnpj_maps_to_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/99999999000199");
                then.status(404);
            })
            .await;

        let result = service(&server).validate("99999999000199").await;

        assert!(!result.valid);
        assert_eq!(result.code, "not_found");
    }

    #[tokio::test]
    async fn registry_failure_maps_to_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/12345678000199");
                then.status(500);
            })
            .await;

        let result = service(&server).validate("12345678000199").await;

        assert!(!result.valid);
        assert_eq!(result.code, "error");
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let result = CnpjValidation::failure("not_found", "CNPJ não encontrado na Receita Federal");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["valid"], false);
        assert!(json.get("company_name").is_none());
        assert!(json.get("situation").is_none());
    }
}
