//! Structured logging configuration.
//!
//! This module provides structured logging with request correlation and
//! security event tracking. Raw tokens never reach the logs; see
//! [`token_fingerprint`].

use sha2::{Digest, Sha256};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Hex characters of the SHA-256 digest kept in a token fingerprint
const FINGERPRINT_LEN: usize = 12;

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var. Records emitted
/// through the `log` facade by the `user_login` crate are forwarded to the
/// same subscriber.
///
/// # Example
///
/// ```no_run
/// use ul_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Short, stable identifier for a token that is safe to log
///
/// # Example
///
/// ```
/// use ul_server::logging::token_fingerprint;
///
/// let fp = token_fingerprint("eyJhbGciOiJIUzI1NiJ9.e30.sig");
/// assert_eq!(fp.len(), 12);
/// assert!(!fp.contains("eyJ"));
/// ```
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `subject` - Optional user id or email the event concerns
/// * `token` - Optional token involved; only its fingerprint is logged
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use ul_server::logging::log_security_event;
///
/// log_security_event(
///     "failed_login",
///     Some("player@example.com"),
///     None,
///     "Invalid email or password",
/// );
/// ```
pub fn log_security_event(
    event_type: &str,
    subject: Option<&str>,
    token: Option<&str>,
    message: &str,
) {
    let token_fp = token.map(token_fingerprint);
    tracing::warn!(
        event_type = event_type,
        subject = subject,
        token_fp = token_fp.as_deref(),
        "SECURITY: {}",
        message
    );
}
