//! Tower middleware pipeline for the HTTP surface.
//!
//! # Middleware Order
//! Middleware is applied in layers. When using `.layer()` on a router:
//! - Outermost layer is added last
//! - Request flows: outermost → innermost → handler
//! - Response flows: handler → innermost → outermost
//!
//! The stack, outermost first: request id → trace → timeout → CORS →
//! rate limit → auth → metrics.

mod auth;
mod client_ip;
mod metrics;
mod rate_limit;
mod request_id;

pub use auth::{AuthLayer, is_public_route};
pub use client_ip::ClientIp;
pub use metrics::MetricsLayer;
pub use rate_limit::RateLimitLayer;
pub use request_id::{RequestId, RequestIdLayer};
