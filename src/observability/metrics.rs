//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vault_admissions_total` (counter): admission outcomes by `outcome`
//! - `vault_requests_total` (counter): gated requests by `endpoint`, `status`
//! - `vault_request_duration_seconds` (histogram): latency by `endpoint`
//! - `vault_tracked_clients` (gauge): live entries in the window table
//! - `vault_counter_evictions_total` (counter): windows evicted at capacity
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

pub fn record_admission(outcome: &'static str) {
    counter!("vault_admissions_total", "outcome" => outcome).increment(1);
}

pub fn record_request(endpoint: &'static str, status: u16, start: Instant) {
    counter!(
        "vault_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("vault_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tracked_clients(count: usize) {
    gauge!("vault_tracked_clients").set(count as f64);
}

pub fn record_counter_eviction() {
    counter!("vault_counter_evictions_total").increment(1);
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}
