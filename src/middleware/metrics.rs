//! Request metrics middleware.
//!
//! Records request count and duration using the `metrics` crate
//! (rendered by the Prometheus exporter at `/metrics`).
//!
//! # Metrics Emitted
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `http_requests_total` | Counter | `method`, `path`, `status` | Total request count |
//! | `http_request_duration_seconds` | Histogram | `method`, `path`, `status` | Request latency |
//!
//! Paths are normalized against the known route table, with id segments
//! collapsed to `{id}`; anything unrecognized is bucketed as `/*` so
//! label cardinality stays bounded.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use tower::{Layer, Service};

/// Fixed routes reported verbatim.
const KNOWN_PATHS: &[&str] = &[
    "/",
    "/health",
    "/health/live",
    "/health/ready",
    "/metrics",
    "/api/token",
    "/api/token/refresh",
    "/api/validate-cnpj",
    "/api/registrations",
    "/api/registrations/export",
    "/api/documents",
    "/api/dashboard",
];

/// Tower layer for request metrics collection.
///
/// Innermost layer in the stack so it measures just the handler work,
/// after auth and rate limiting have settled the request's fate.
#[derive(Clone, Copy, Default)]
pub struct MetricsLayer;

impl MetricsLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware { inner }
    }
}

/// Metrics middleware service.
#[derive(Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        let path = normalize_path(req.uri().path());

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;

            let duration = start.elapsed().as_secs_f64();
            let status = response.status().as_u16().to_string();

            let labels = [("method", method), ("path", path), ("status", status)];

            metrics::counter!("http_requests_total", &labels).increment(1);
            metrics::histogram!("http_request_duration_seconds", &labels).record(duration);

            Ok(response)
        })
    }
}

/// Normalize a request path into a bounded label value.
fn normalize_path(path: &str) -> String {
    if KNOWN_PATHS.contains(&path) {
        return path.to_string();
    }

    if let Some(rest) = path.strip_prefix("/api/registrations/") {
        if !rest.is_empty() && !rest.contains('/') {
            return "/api/registrations/{id}".to_string();
        }
        if rest.ends_with("/history") {
            return "/api/registrations/{id}/history".to_string();
        }
        if rest.ends_with("/export") {
            return "/api/registrations/{id}/export".to_string();
        }
    }

    if let Some(rest) = path.strip_prefix("/api/documents/") {
        if !rest.is_empty() && !rest.contains('/') {
            return "/api/documents/{id}".to_string();
        }
        if rest.ends_with("/download") {
            return "/api/documents/{id}/download".to_string();
        }
        if rest.ends_with("/file") {
            return "/api/documents/{id}/file".to_string();
        }
    }

    "/*".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths_pass_through() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
        assert_eq!(normalize_path("/metrics"), "/metrics");
        assert_eq!(normalize_path("/api/registrations"), "/api/registrations");
        assert_eq!(
            normalize_path("/api/registrations/export"),
            "/api/registrations/export"
        );
    }

    #[test]
    fn id_segments_are_collapsed() {
        assert_eq!(
            normalize_path("/api/registrations/2c6cc8a4-9d6e-4b19-9c36-000000000000"),
            "/api/registrations/{id}"
        );
        assert_eq!(
            normalize_path("/api/registrations/2c6cc8a4/history"),
            "/api/registrations/{id}/history"
        );
        assert_eq!(
            normalize_path("/api/registrations/2c6cc8a4/export"),
            "/api/registrations/{id}/export"
        );
        assert_eq!(
            normalize_path("/api/documents/2c6cc8a4/download"),
            "/api/documents/{id}/download"
        );
        assert_eq!(
            normalize_path("/api/documents/2c6cc8a4/file"),
            "/api/documents/{id}/file"
        );
    }

    #[test]
    fn unknown_paths_bucketed() {
        assert_eq!(normalize_path("/unknown/route"), "/*");
        assert_eq!(normalize_path("/api/registrations/x/y/z"), "/*");
    }
}
