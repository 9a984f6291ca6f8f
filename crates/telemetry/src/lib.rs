//! Telemetry setup for tracing, Prometheus metrics, and Sentry error tracking.
//!
//! This crate provides the observability stack for the credentialing service:
//! - **Tracing**: Structured logging, JSON in production, compact for development
//! - **Metrics**: Prometheus metrics endpoint
//! - **Error tracking**: Optional Sentry integration
//!
//! # Features
//! - `prometheus` (default): Prometheus metrics exporter
//! - `otlp`: OpenTelemetry OTLP span exporter
//! - `sentry`: Sentry error tracking

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "prometheus")]
pub use metrics_exporter_prometheus::PrometheusHandle;

#[cfg(feature = "otlp")]
use opentelemetry::KeyValue;
#[cfg(feature = "otlp")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "otlp")]
use opentelemetry_sdk::{
    Resource,
    trace::{Sampler, SdkTracerProvider},
};

#[cfg(feature = "sentry")]
pub use sentry;

/// Service name constant.
const SERVICE_NAME: &str = "credentialing-service";

/// Default filter directives. Chatty dependencies are pinned down so the
/// application log stays readable at INFO.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "sqlx::query=warn",
    "tower=info",
    "h2=info",
    "hyper=info",
    "hyper_util=info",
    "aws_config=warn",
    "aws_smithy_runtime=warn",
    "aws_sdk_s3=warn",
    "lettre=info",
    "sentry=warn",
];

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: String,
    /// Use JSON log format (production default)
    pub json_logs: bool,
    /// Extra filter directives appended after the defaults
    pub log_directives: Option<String>,
    /// OpenTelemetry OTLP endpoint (optional)
    pub otlp_endpoint: Option<String>,
    /// Sentry DSN (optional)
    pub sentry_dsn: Option<String>,
    /// Environment name (e.g., "production", "development")
    pub environment: Option<String>,
    /// Application version
    pub version: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "INFO".to_string(),
            json_logs: true,
            log_directives: None,
            otlp_endpoint: None,
            sentry_dsn: None,
            environment: None,
            version: None,
        }
    }
}

/// Active telemetry handles that need graceful shutdown.
pub struct TelemetryGuard {
    #[cfg(feature = "otlp")]
    otel_provider: Option<SdkTracerProvider>,
    #[cfg(feature = "sentry")]
    _sentry_guard: Option<sentry::ClientInitGuard>,
}

impl TelemetryGuard {
    /// Shutdown telemetry providers gracefully.
    pub fn shutdown(self) {
        #[cfg(feature = "otlp")]
        if let Some(provider) = self.otel_provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shutdown OpenTelemetry provider: {e}");
            }
        }
        // Sentry guard is dropped automatically
    }
}

/// Initialize Prometheus metrics exporter and return the handle for the /metrics endpoint.
///
/// # Panics
/// Panics if the Prometheus recorder fails to install.
#[cfg(feature = "prometheus")]
#[must_use]
pub fn init_metrics() -> PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Initialize OpenTelemetry tracing with OTLP exporter.
///
/// Returns `None` if OTLP endpoint is not configured.
#[cfg(feature = "otlp")]
fn init_opentelemetry(otlp_endpoint: Option<&str>) -> Option<SdkTracerProvider> {
    let endpoint = otlp_endpoint?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("Failed to create OTLP exporter");

    let resource = Resource::builder()
        .with_attributes([KeyValue::new("service.name", SERVICE_NAME)])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_sampler(Sampler::AlwaysOn)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_tracer_provider(provider.clone());

    Some(provider)
}

/// Initialize Sentry error tracking.
///
/// Returns `None` if Sentry DSN is not configured.
#[cfg(feature = "sentry")]
fn init_sentry(config: &TelemetryConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: config.version.clone().map(Into::into),
            environment: config.environment.clone().map(Into::into),
            traces_sample_rate: 1.0,
            attach_stacktrace: true,
            // Applicant emails and tax ids must never leave the service
            send_default_pii: false,
            ..Default::default()
        },
    ));

    if guard.is_enabled() {
        tracing::info!("Sentry initialized");
        Some(guard)
    } else {
        tracing::warn!("Sentry DSN provided but client not enabled");
        None
    }
}

fn build_env_filter(config: &TelemetryConfig) -> EnvFilter {
    let level = match config.log_level.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "WARN" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse().expect("static directive"));
    }
    if let Some(extra) = &config.log_directives {
        for directive in extra.split(',').filter(|d| !d.trim().is_empty()) {
            match directive.trim().parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(e) => eprintln!("Ignoring invalid log directive {directive:?}: {e}"),
            }
        }
    }
    filter
}

/// Setup complete logging/tracing stack.
///
/// - Console logging (JSON or human-readable)
/// - `OpenTelemetry` tracing (if OTLP endpoint configured)
/// - Sentry error tracking (if DSN configured)
///
/// Returns a guard that should be kept alive for the application lifetime.
/// Call `shutdown()` on the guard for graceful shutdown.
///
/// # Panics
/// Panics if the tracing subscriber cannot be initialized.
#[must_use]
pub fn setup_telemetry(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = build_env_filter(config);

    // Initialize Sentry first (before tracing subscriber)
    #[cfg(feature = "sentry")]
    let sentry_guard = init_sentry(config);

    // Initialize OpenTelemetry if endpoint is configured
    #[cfg(feature = "otlp")]
    let otel_provider = init_opentelemetry(config.otlp_endpoint.as_deref());

    // Build fmt layer based on config
    let fmt_layer = if config.json_logs {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_timer(ChronoLocal::new("%H:%M:%S%.3f".to_string()))
            .compact()
            .boxed()
    };

    // Build and initialize the subscriber
    #[cfg(all(feature = "otlp", feature = "sentry"))]
    {
        let registry = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);

        if otel_provider.is_some() {
            let tracer = opentelemetry::global::tracer(SERVICE_NAME);
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            let sentry_layer = sentry_tracing::layer();
            registry.with(otel_layer).with(sentry_layer).init();
        } else {
            let sentry_layer = sentry_tracing::layer();
            registry.with(sentry_layer).init();
        }
    }

    #[cfg(all(feature = "otlp", not(feature = "sentry")))]
    {
        let registry = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);

        if otel_provider.is_some() {
            let tracer = opentelemetry::global::tracer(SERVICE_NAME);
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            registry.with(otel_layer).init();
        } else {
            registry.init();
        }
    }

    #[cfg(all(not(feature = "otlp"), feature = "sentry"))]
    {
        let sentry_layer = sentry_tracing::layer();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(sentry_layer)
            .init();
    }

    #[cfg(all(not(feature = "otlp"), not(feature = "sentry")))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    TelemetryGuard {
        #[cfg(feature = "otlp")]
        otel_provider,
        #[cfg(feature = "sentry")]
        _sentry_guard: sentry_guard,
    }
}

/// Capture an error to Sentry (if enabled).
#[cfg(feature = "sentry")]
pub fn capture_error<E: std::fmt::Display>(error: &E) {
    sentry::capture_message(&error.to_string(), sentry::Level::Error);
}

/// Capture an error to Sentry (no-op if Sentry feature is disabled).
#[cfg(not(feature = "sentry"))]
pub fn capture_error<E: std::fmt::Display>(_error: &E) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.log_level, "INFO");
        assert!(config.json_logs);
        assert!(config.otlp_endpoint.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn extra_directives_are_accepted() {
        let config = TelemetryConfig {
            log_directives: Some("credentialing_service=debug,cred_db=trace".to_string()),
            ..TelemetryConfig::default()
        };
        // Builds without panicking; invalid directives are skipped with a warning
        let _filter = build_env_filter(&config);
    }
}
