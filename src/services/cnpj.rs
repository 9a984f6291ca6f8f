//! Public CNPJ lookup endpoint.

use axum::Json;
use axum::extract::{Query, State};
use cred_core::AppError;
use serde::Deserialize;

use crate::core::CnpjValidation;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct CnpjQuery {
    pub cnpj: Option<String>,
}

/// `GET /api/validate-cnpj?cnpj=...` — registry lookup for form feedback.
///
/// Always 200 with the outcome in the body; only a missing parameter is
/// a request error.
pub async fn validate_cnpj(
    State(state): State<AppState>,
    Query(params): Query<CnpjQuery>,
) -> Result<Json<CnpjValidation>, AppError> {
    let Some(cnpj) = params.cnpj else {
        return Err(AppError::invalid("cnpj", "This parameter is required"));
    };

    Ok(Json(state.cnpj.validate(&cnpj).await))
}
