//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by instance, method, status
//! - `proxy_request_duration_seconds` (histogram): latency by instance
//! - `proxy_upstream_errors_total` (counter): failed forwards by instance

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_request(instance: &str, method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "instance" => instance.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds", "instance" => instance.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(instance: &str) {
    metrics::counter!("proxy_upstream_errors_total", "instance" => instance.to_string())
        .increment(1);
}
