//! Prometheus metrics for the login service.
//!
//! Counters are recorded through the `metrics` facade; when no exporter is
//! installed they are no-ops. The exporter serves Prometheus text format at
//! `http://<addr>/metrics`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ul_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::login_attempt("password", true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Record a login attempt.
///
/// `method` is `"password"` or `"federated"`.
pub fn login_attempt(method: &'static str, success: bool) {
    metrics::counter!("logins_total",
        "method" => method,
        "success" => success.to_string()
    )
    .increment(1);
}

/// Record a successful logout.
pub fn logout() {
    metrics::counter!("logouts_total").increment(1);
}

/// Record a token validation by outcome (`"valid"`, `"expired"`, `"invalid"`, `"error"`).
pub fn token_validation(outcome: &'static str) {
    metrics::counter!("token_validations_total", "outcome" => outcome).increment(1);
}

/// Record a registration attempt.
pub fn registration(success: bool) {
    metrics::counter!("registrations_total", "success" => success.to_string()).increment(1);
}
