//! Client IP extraction.
//!
//! The service normally sits behind nginx, so `X-Forwarded-For` (first
//! hop) and `X-Real-IP` are consulted before falling back to the socket
//! peer address. The result feeds the anonymous rate limiter.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use http::Request;

/// Header priority for IP extraction (highest to lowest).
const IP_HEADERS: &[&str] = &[
    "x-forwarded-for", // first IP in the chain is the client
    "x-real-ip",
];

/// Client IP address extracted from a request.
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub Option<IpAddr>);

impl ClientIp {
    /// Extract the client IP from proxy headers or connection info.
    #[must_use]
    pub fn from_request<T>(req: &Request<T>) -> Self {
        Self(extract_client_ip(req))
    }

    /// Get the IP address if available.
    #[inline]
    #[must_use]
    pub const fn ip(&self) -> Option<IpAddr> {
        self.0
    }
}

fn extract_client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    for header in IP_HEADERS {
        let ip = req
            .headers()
            .get(*header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|ip_str| ip_str.parse::<IpAddr>().ok());

        if ip.is_some() {
            return ip;
        }
    }

    // Direct connections: set by into_make_service_with_connect_info
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_forwarded_ip() {
        let req = Request::builder()
            .header(
                "x-forwarded-for",
                "203.0.113.195, 70.41.3.18, 150.172.238.178",
            )
            .body(())
            .unwrap();
        assert_eq!(
            ClientIp::from_request(&req).ip(),
            Some("203.0.113.195".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn prefers_forwarded_for_over_real_ip() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.1")
            .header("x-real-ip", "192.0.2.1")
            .body(())
            .unwrap();
        assert_eq!(
            ClientIp::from_request(&req).ip(),
            Some("203.0.113.1".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn falls_back_to_real_ip() {
        let req = Request::builder()
            .header("x-real-ip", "192.0.2.1")
            .body(())
            .unwrap();
        assert_eq!(
            ClientIp::from_request(&req).ip(),
            Some("192.0.2.1".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn handles_ipv6() {
        let req = Request::builder()
            .header("x-forwarded-for", "2001:db8::1")
            .body(())
            .unwrap();
        assert_eq!(
            ClientIp::from_request(&req).ip(),
            Some("2001:db8::1".parse::<IpAddr>().unwrap())
        );
    }

    #[test]
    fn invalid_or_missing_headers_yield_none() {
        let req = Request::builder()
            .header("x-forwarded-for", "not-an-ip")
            .body(())
            .unwrap();
        assert!(ClientIp::from_request(&req).ip().is_none());

        let req = Request::builder().body(()).unwrap();
        assert!(ClientIp::from_request(&req).ip().is_none());
    }
}
