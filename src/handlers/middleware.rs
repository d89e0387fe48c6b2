//! Request-level middleware: GET-only gate and access logging.

use crate::errors::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{net::SocketAddr, time::Instant};
use tracing::{error, info, warn};

/// Reject every method but GET with 405 before routing.
pub async fn get_only(request: Request, next: Next) -> Response {
    if request.method() == Method::GET {
        return next.run(request).await;
    }
    let mut response =
        AppError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed").into_response();
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static("GET"));
    response
}

/// Log one line per request with the client IP taken from `ip_header`,
/// falling back to the peer address.
pub async fn access_log(
    State(ip_header): State<&'static str>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(request.headers(), ip_header)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "-".into());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        error!(%method, %path, status, elapsed_ms, %client_ip, "request failed");
    } else if response.status().is_client_error() {
        warn!(%method, %path, status, elapsed_ms, %client_ip, "request rejected");
    } else {
        info!(%method, %path, status, elapsed_ms, %client_ip, "request served");
    }
    response
}

/// First address in `ip_header`, if present and readable.
pub fn client_ip(headers: &HeaderMap, ip_header: &str) -> Option<String> {
    headers
        .get(ip_header)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("203.0.113.7"));
        headers.insert("x-real-ip", HeaderValue::from_static(" 198.51.100.1, 10.0.0.1"));
        assert_eq!(
            client_ip(&headers, "cf-connecting-ip").as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(
            client_ip(&headers, "x-real-ip").as_deref(),
            Some("198.51.100.1")
        );
    }

    #[test]
    fn missing_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, "x-real-ip"), None);
    }
}
