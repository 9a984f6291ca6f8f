//! Route table and health endpoints.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use cred_core::AppError;
use cred_telemetry::PrometheusHandle;
use http::StatusCode;
use serde::Serialize;

use crate::services::{auth, cnpj, dashboard, documents, registrations};
use crate::startup::AppState;

/// Build version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: DateTime<Utc>,
    checks: HealthChecks,
}

#[derive(Serialize)]
struct HealthChecks {
    database: CheckResult,
}

#[derive(Serialize)]
struct CheckResult {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    const fn healthy() -> Self {
        Self {
            status: "healthy",
            message: None,
        }
    }

    fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: "unhealthy",
            message: Some(message.into()),
        }
    }
}

/// Build the full route table with the given application state.
pub fn api_routes(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/", get(|| async { "credentialing-service" }))
        .route("/health", get(health_handler))
        .route("/health/live", get(|| async { "OK" }))
        .route("/health/ready", get(health_handler))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
        .route("/api/token", post(auth::token))
        .route("/api/token/refresh", post(auth::refresh))
        .route("/api/validate-cnpj", get(cnpj::validate_cnpj))
        .route(
            "/api/registrations",
            post(registrations::create).get(registrations::list),
        )
        .route("/api/registrations/export", get(registrations::export_all))
        .route(
            "/api/registrations/:id",
            get(registrations::get)
                .patch(registrations::update)
                .delete(registrations::delete),
        )
        .route(
            "/api/registrations/:id/history",
            get(registrations::history),
        )
        .route("/api/registrations/:id/export", get(registrations::export_one))
        .route(
            "/api/documents",
            post(documents::upload).get(documents::list),
        )
        .route("/api/documents/:id", get(documents::get))
        .route("/api/documents/:id/download", get(documents::download))
        .route("/api/documents/:id/file", get(documents::file))
        .route("/api/dashboard", get(dashboard::dashboard))
        .fallback(|| async { AppError::NotFound("Route not found".to_string()) })
        .with_state(state)
}

/// `GET /health` — liveness plus a database ping.
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = if state.db.health_check().await {
        CheckResult::healthy()
    } else {
        CheckResult::unhealthy("Database connection failed")
    };

    let healthy = database.status == "healthy";
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            version: VERSION,
            timestamp: Utc::now(),
            checks: HealthChecks { database },
        }),
    )
}
