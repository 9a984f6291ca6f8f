//! Application state and server assembly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use cred_core::JwtValidator;
use cred_db::{Database, DbConfig, NewReviewerParams, ReviewerRole, create_pool};
use cred_storage::{S3Config, S3Storage};
use cred_telemetry::PrometheusHandle;
use http::header::HeaderName;
use http::{Method, StatusCode};
use secrecy::ExposeSecret;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, warn};

use crate::config::Config;
use crate::core::document_store::LocalStore;
use crate::core::{CnpjService, DocumentStore, EmailProvider, password};
use crate::middleware::{AuthLayer, MetricsLayer, RateLimitLayer, RequestIdLayer};
use crate::routes::api_routes;

/// Request body ceiling: the 5 MiB document limit plus multipart framing.
const BODY_LIMIT_BYTES: usize = 6 * 1024 * 1024;

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: JwtValidator,
    pub email: EmailProvider,
    pub store: DocumentStore,
    pub cnpj: CnpjService,
    pub access_ttl_secs: u64,
    pub refresh_ttl_secs: u64,
}

/// Build the router and resolve the listen address.
///
/// Connects to the database, bootstraps the administrator account,
/// chooses the document store and email provider, and assembles the
/// middleware stack.
pub async fn build_app(
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> anyhow::Result<(Router, SocketAddr)> {
    let validator = JwtValidator::new(&config.jwt_secret_key);

    let db_config = DbConfig::new(
        config.database_url(),
        config.db_min_connections,
        config.db_max_connections,
        config.db_acquire_timeout(),
    );
    let pool = create_pool(&db_config).await?;
    info!("Connected to database");
    let db = Database::new(pool);

    bootstrap_admin(config, &db).await?;

    let store = init_store(config).await;
    let email = EmailProvider::from_config(config);
    info!(provider = email.name(), "Email provider ready");
    let cnpj = CnpjService::new(&config.cnpj_api_url, config.cnpj_timeout_secs);

    let addr: SocketAddr = config.http_addr.parse()?;

    let state = AppState {
        db,
        jwt: validator.clone(),
        email,
        store,
        cnpj,
        access_ttl_secs: config.access_token_ttl_secs,
        refresh_ttl_secs: config.refresh_token_ttl_secs,
    };

    // Outermost first: request id -> trace -> timeout -> CORS ->
    // rate limit -> auth -> metrics.
    let middleware = ServiceBuilder::new()
        .layer(RequestIdLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ))
        .layer(build_cors(config.cors_origins.as_deref()))
        .layer(RateLimitLayer::new(config.anon_rate_limit_per_min))
        .layer(AuthLayer::new(validator))
        .layer(MetricsLayer::new());

    let app = api_routes(state, metrics_handle)
        .layer(middleware)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES));

    Ok((app, addr))
}

/// Create the administrator account named by `ADMIN_EMAIL` /
/// `ADMIN_PASSWORD` when it does not already exist. Idempotent across
/// restarts.
async fn bootstrap_admin(config: &Config, db: &Database) -> anyhow::Result<()> {
    let (Some(email), Some(admin_password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    if db.reviewers.email_exists(email).await? {
        info!("Administrator account already present");
        return Ok(());
    }

    let password_hash = password::hash(admin_password.expose_secret())?;
    db.reviewers
        .create(NewReviewerParams {
            name: "Administrator",
            email,
            password_hash: &password_hash,
            role: ReviewerRole::Administrator,
        })
        .await?;
    info!("Administrator account created");
    Ok(())
}

/// Pick the document store. S3 needs the endpoint URL plus both
/// credentials; anything less falls back to local disk.
async fn init_store(config: &Config) -> DocumentStore {
    let s3_settings = match (
        &config.s3_url,
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
    ) {
        (Some(url), Some(key_id), Some(secret)) => Some((url, key_id.clone(), secret.clone())),
        _ => None,
    };

    let Some((url, key_id, secret)) = s3_settings else {
        info!(root = %config.media_root, "S3 not configured, using local document storage");
        return DocumentStore::Local(LocalStore::new(config.media_root.as_str()));
    };

    match S3Config::from_url(url, key_id, secret) {
        Ok(s3_config) => {
            let storage = S3Storage::new(s3_config);
            if !storage.health_check().await {
                warn!("S3 bucket is not reachable, uploads will fail until it is");
            }
            DocumentStore::S3(Arc::new(storage))
        }
        Err(e) => {
            error!(error = %e, "Invalid S3 configuration, using local document storage");
            DocumentStore::Local(LocalStore::new(config.media_root.as_str()))
        }
    }
}

/// CORS policy: permissive by default, restricted to the configured
/// origins when `CORS_ORIGINS` is set.
fn build_cors(origins: Option<&str>) -> CorsLayer {
    let cors = match origins {
        Some("*") | None => CorsLayer::new().allow_origin(Any),
        Some(list) => {
            let parsed: Vec<_> = list
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(origin, error = %e, "Ignoring unparseable CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new().allow_origin(parsed)
        }
    };

    cors.allow_methods([
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ])
    .allow_headers(Any)
    .expose_headers([HeaderName::from_static("x-request-id")])
    .max_age(Duration::from_secs(3600))
}
