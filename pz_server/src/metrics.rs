//! Prometheus metrics for monitoring the tournament server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener for
//! scraping by monitoring systems.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Engine Metrics**: Zones generated, results recorded, roster changes, rejections
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pz_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/zones/{zone_id}/close", 200);
//! metrics::results_recorded_total("zone");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template so label cardinality stays bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Engine Metrics
// ============================================================================

/// Increment zones generated counter by the number of zones created.
pub fn zones_generated_total(zones: usize) {
    metrics::counter!("zones_generated_total").increment(zones as u64);
}

/// Increment results recorded counter, `stage` is `zone` or `bracket`.
pub fn results_recorded_total(stage: &'static str) {
    metrics::counter!("results_recorded_total", "stage" => stage).increment(1);
}

/// Increment roster changes counter (`move`, `withdraw`).
pub fn roster_changes_total(kind: &'static str) {
    metrics::counter!("roster_changes_total", "kind" => kind).increment(1);
}

/// Increment rejected operations counter by error class.
pub fn rejections_total(kind: &str) {
    metrics::counter!("rejections_total", "kind" => kind.to_string()).increment(1);
}
