//! JWT authentication middleware.
//!
//! Validates Bearer tokens and injects `AuthInfo` into request extensions.
//! Uses the shared `JwtValidator` from `cred-core`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use cred_core::{AuthInfo, JwtError, JwtValidator};
use http::{Method, Request, Response, StatusCode};
use phf::phf_set;
use tower::{Layer, Service};
use tracing::{Span, debug};

use super::client_ip::ClientIp;

/// Public routes that bypass authentication, regardless of method.
/// Uses a compile-time perfect hash set for O(1) lookup with zero runtime
/// initialization.
static PUBLIC_ROUTES: phf::Set<&'static str> = phf_set! {
    "/",
    "/health",
    "/health/live",
    "/health/ready",
    "/metrics",
    "/api/token",
    "/api/token/refresh",
    "/api/validate-cnpj",
};

/// Routes whose POST is the public intake surface. Every other method on
/// these paths (the reviewer list endpoints) still requires a token.
static PUBLIC_POST_ROUTES: phf::Set<&'static str> = phf_set! {
    "/api/registrations",
    "/api/documents",
};

/// Tower layer for JWT authentication.
#[derive(Clone)]
pub struct AuthLayer {
    validator: JwtValidator,
}

impl AuthLayer {
    #[must_use]
    pub const fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            validator: self.validator.clone(),
        }
    }
}

/// Authentication middleware service.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    validator: JwtValidator,
}

impl<S, ReqBody> Service<Request<ReqBody>> for AuthMiddleware<S>
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

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // Make the client IP available to handlers as an extension
        let client_ip = ClientIp::from_request(&req);
        req.extensions_mut().insert(client_ip);

        // Allow CORS preflight
        if req.method() == Method::OPTIONS {
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        if is_public_route(req.method(), req.uri().path()) {
            debug!(path = req.uri().path(), "Public route - skipping auth");
            let mut inner = self.inner.clone();
            return Box::pin(async move { inner.call(req).await });
        }

        match self.authenticate(&req) {
            Ok(auth_info) => {
                Span::current().record("user_id", auth_info.user_id.to_string());
                debug!(user_id = %auth_info.user_id, role = %auth_info.role, "Authenticated");
                req.extensions_mut().insert(auth_info);
                let mut inner = self.inner.clone();
                Box::pin(async move { inner.call(req).await })
            }
            Err(err) => Box::pin(async move { Ok(unauthenticated_response(&err)) }),
        }
    }
}

impl<S> AuthMiddleware<S> {
    const BEARER_PREFIX: &str = "Bearer ";

    fn authenticate<T>(&self, req: &Request<T>) -> Result<AuthInfo, JwtError> {
        let header = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(JwtError::MissingHeader)?;

        let token = header
            .strip_prefix(Self::BEARER_PREFIX)
            .or_else(|| header.strip_prefix("bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(JwtError::InvalidFormat)?;

        self.validator.validate(token)
    }
}

/// Whether this method and path combination skips authentication.
#[must_use]
pub fn is_public_route(method: &Method, path: &str) -> bool {
    if PUBLIC_ROUTES.contains(path) {
        return true;
    }
    method == Method::POST && PUBLIC_POST_ROUTES.contains(path)
}

/// 401 response in the standard error envelope.
fn unauthenticated_response(err: &JwtError) -> Response<Body> {
    let body = serde_json::json!({
        "error": {
            "code": "unauthenticated",
            "message": err.to_string(),
        }
    });
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("content-type", "application/json")
        .header("www-authenticate", "Bearer")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn public_routes_identified_correctly() {
        assert!(is_public_route(&Method::GET, "/"));
        assert!(is_public_route(&Method::GET, "/health"));
        assert!(is_public_route(&Method::GET, "/health/live"));
        assert!(is_public_route(&Method::GET, "/health/ready"));
        assert!(is_public_route(&Method::GET, "/metrics"));
        assert!(is_public_route(&Method::POST, "/api/token"));
        assert!(is_public_route(&Method::POST, "/api/token/refresh"));
        assert!(is_public_route(&Method::GET, "/api/validate-cnpj"));
    }

    #[test]
    fn intake_is_public_only_for_post() {
        assert!(is_public_route(&Method::POST, "/api/registrations"));
        assert!(is_public_route(&Method::POST, "/api/documents"));
        assert!(!is_public_route(&Method::GET, "/api/registrations"));
        assert!(!is_public_route(&Method::GET, "/api/documents"));
    }

    #[test]
    fn reviewer_routes_are_protected() {
        assert!(!is_public_route(&Method::GET, "/api/dashboard"));
        assert!(!is_public_route(&Method::GET, "/api/registrations/export"));
        assert!(!is_public_route(
            &Method::PATCH,
            "/api/registrations/0a1b2c3d"
        ));
        assert!(!is_public_route(&Method::GET, "/api/documents/0a1b2c3d"));
    }

    #[test]
    fn jwt_validator_rejects_invalid_token() {
        let secret = SecretString::from("test_secret_32_chars_minimum!!!!");
        let validator = JwtValidator::new(&secret);
        assert!(validator.validate("invalid.token.here").is_err());
    }

    #[test]
    fn unauthenticated_response_carries_challenge() {
        let resp = unauthenticated_response(&JwtError::MissingHeader);
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get("www-authenticate").unwrap(),
            "Bearer"
        );
    }
}
