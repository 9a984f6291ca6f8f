//! Fixed-window rate limiting for the anonymous intake routes.
//!
//! Authenticated reviewer traffic is not throttled; the public surface
//! (token minting, registration and document intake, CNPJ lookups) is
//! limited per client IP so a single submitter cannot flood the queue
//! or burn the registry quota.

use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use dashmap::DashMap;
use http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::warn;

use super::auth::is_public_route;
use super::client_ip::ClientIp;

/// Window length for the fixed-window counter.
const WINDOW: Duration = Duration::from_secs(60);

/// Map size that triggers an opportunistic sweep of expired windows.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Shared per-IP fixed-window counters.
#[derive(Debug)]
pub struct RateLimiter {
    limit_per_min: u32,
    windows: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(limit_per_min: u32) -> Self {
        Self {
            limit_per_min,
            windows: DashMap::new(),
        }
    }

    /// Register a hit for this IP. `Err` carries the seconds until the
    /// window resets.
    fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self.windows.entry(ip).or_insert(Window {
            start: now,
            count: 0,
        });

        let elapsed = now.duration_since(entry.start);
        if elapsed >= WINDOW {
            entry.start = now;
            entry.count = 0;
        }

        entry.count += 1;
        if entry.count > self.limit_per_min {
            let retry_after = WINDOW.saturating_sub(elapsed).as_secs().max(1);
            return Err(retry_after);
        }
        drop(entry);

        if self.windows.len() > SWEEP_THRESHOLD {
            self.windows
                .retain(|_, w| now.duration_since(w.start) < WINDOW);
        }
        Ok(())
    }
}

/// Tower layer applying [`RateLimiter`] to anonymous routes.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    #[must_use]
    pub fn new(limit_per_min: u32) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(limit_per_min)),
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limit middleware service.
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RateLimitMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if is_throttled(req.method(), req.uri().path()) {
            // A request without a resolvable IP passes through; the
            // listener always provides a peer address in practice.
            if let Some(ip) = ClientIp::from_request(&req).ip() {
                if let Err(retry_after) = self.limiter.check(ip) {
                    warn!(%ip, path = req.uri().path(), "Rate limit exceeded");
                    return Box::pin(async move { Ok(too_many_requests(retry_after)) });
                }
            }
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Anonymous API routes subject to throttling. Health and metrics
/// probes are exempt.
fn is_throttled(method: &Method, path: &str) -> bool {
    path.starts_with("/api/") && is_public_route(method, path)
}

fn too_many_requests(retry_after: u64) -> Response<Body> {
    let body = serde_json::json!({
        "error": {
            "code": "rate_limited",
            "message": "Too many requests. Try again later.",
        }
    });
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header("content-type", "application/json")
        .header("retry-after", retry_after.to_string())
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}
