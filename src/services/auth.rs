//! Reviewer login and token refresh.

use axum::Json;
use axum::extract::State;
use cred_core::{AppError, TokenPair};
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::password;
use crate::startup::AppState;

/// Single message for every credential failure so the endpoint does not
/// reveal which accounts exist.
const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// `POST /api/token` — exchange reviewer credentials for a JWT pair.
pub async fn token(
    State(state): State<AppState>,
    Json(body): Json<TokenRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let reviewer = match state.db.reviewers.get_active_by_email(&body.email).await {
        Ok(reviewer) => reviewer,
        Err(AppError::NotFound(_)) => {
            warn!("Login attempt for unknown or inactive account");
            return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e),
    };

    if !password::verify(&body.password, &reviewer.password) {
        warn!(reviewer_id = %reviewer.id, "Login attempt with wrong password");
        return Err(AppError::Unauthenticated(BAD_CREDENTIALS.to_string()));
    }

    let pair = state
        .jwt
        .generate_pair(&reviewer, state.access_ttl_secs, state.refresh_ttl_secs)?;

    // Best effort; a failed stamp must not block the login.
    if let Err(e) = state.db.reviewers.record_login(reviewer.id).await {
        warn!(reviewer_id = %reviewer.id, error = %e, "Failed to stamp last_login");
    }

    info!(reviewer_id = %reviewer.id, role = %reviewer.role, "Reviewer logged in");
    Ok(Json(pair))
}

/// `POST /api/token/refresh` — mint a new pair from a refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let auth = state
        .jwt
        .validate_refresh(&body.refresh)
        .map_err(|e| AppError::Unauthenticated(e.to_string()))?;

    let pair = state
        .jwt
        .generate_pair(&auth, state.access_ttl_secs, state.refresh_ttl_secs)?;

    Ok(Json(pair))
}
