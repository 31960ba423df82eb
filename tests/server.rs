//! End-to-end tests against a real listener.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use dev_api_vault::config::VaultConfig;
use dev_api_vault::http::HttpServer;
use dev_api_vault::lifecycle::Shutdown;

mod common;
use common::{test_config, SECRET, SECRET_HEADER};

async fn start(config: VaultConfig) -> (SocketAddr, Shutdown, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(config).unwrap();
    let wait = shutdown.wait();
    let handle = tokio::spawn(async move {
        server.run(listener, wait).await.unwrap();
    });

    (addr, shutdown, handle)
}

#[tokio::test]
async fn test_serves_over_tcp_with_peer_fingerprint() {
    let mut config = test_config();
    config.rate_limit.max_requests = 2;
    let (addr, shutdown, handle) = start(config).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/markdown-to-html");

    let health: Value = client
        .get(format!("http://{addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = client
            .post(&url)
            .header(SECRET_HEADER, SECRET)
            .json(&json!({ "markdown_text": "*hi*" }))
            .send()
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
        statuses.push(response.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 429]);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stopped")
        .unwrap();
}

#[tokio::test]
async fn test_client_request_id_is_echoed() {
    let (addr, shutdown, handle) = start(test_config()).await;

    let response = reqwest::Client::new()
        .get(format!("http://{addr}/"))
        .header("x-request-id", "trace-me-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stopped")
        .unwrap();
}
