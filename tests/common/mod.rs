//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::{ConnectInfo, MockConnectInfo};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use dev_api_vault::config::VaultConfig;
use dev_api_vault::http::HttpServer;
use dev_api_vault::security::{Clock, ManualClock};

pub const SECRET: &str = "test_secret_key";
pub const SECRET_HEADER: &str = "X-RapidAPI-Proxy-Secret";
pub const BOUNDARY: &str = "vault-test-boundary";

pub fn peer(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([203, 0, 113, last_octet], 40_000))
}

/// Defaults plus a known secret. Private targets are allowed so upstream
/// mocks on loopback can be reached.
pub fn test_config() -> VaultConfig {
    let mut config = VaultConfig::default();
    config.auth.secret = Some(SECRET.to_string());
    config.fetch.allow_private_networks = true;
    config
}

/// A router with a fixed peer address and a manual clock.
pub fn app_with_clock(config: VaultConfig) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let server = HttpServer::with_clock(config, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    (server.router().layer(MockConnectInfo(peer(1))), clock)
}

pub fn app(config: VaultConfig) -> Router {
    app_with_clock(config).0
}

/// A router with no peer layer; callers set the peer per request.
pub fn bare_app(config: VaultConfig) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let server = HttpServer::with_clock(config, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    (server.router(), clock)
}

pub fn json_request(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn unauthenticated(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(SECRET_HEADER, SECRET)
        .body(Body::empty())
        .unwrap()
}

pub fn multipart_request(path: &str, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .header(SECRET_HEADER, SECRET)
        .body(Body::from(body))
        .unwrap()
}

pub fn from_peer(mut request: Request<Body>, addr: SocketAddr) -> Request<Body> {
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// Drive one request through the router.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

pub fn header_u64(headers: &HeaderMap, name: &str) -> u64 {
    headers[name].to_str().unwrap().parse().unwrap()
}
