//! Authentication error types.

use std::time::Duration;
use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token time bound elapsed
    #[error("Token has expired")]
    Expired,

    /// Bad signature, malformed token, superseded/revoked token, or unknown subject
    #[error("Invalid token")]
    Invalid,

    /// Email already exists
    #[error("User already exists")]
    Conflict,

    /// No user registered under the given email
    #[error("User not found")]
    NotFound,

    /// Password verification failed
    #[error("Invalid password")]
    InvalidPassword,

    /// Token could not be signed
    #[error("Token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),

    /// Signing algorithm is not usable with a shared secret
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Email address is not well formed
    #[error("Invalid email address")]
    InvalidEmail,

    /// Display name empty or too long
    #[error("Display name must be 1-50 characters")]
    InvalidDisplayName,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// External identity provider rejected the assertion
    #[error("Identity verification failed: {0}")]
    IdentityRejected(String),

    /// No identity verifier configured
    #[error("Federated login is not enabled")]
    FederatedLoginDisabled,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Database call exceeded its time bound
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),
}

impl From<TimeoutError> for AuthError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => AuthError::Timeout(duration),
            TimeoutError::Database(e) => AuthError::Database(e),
        }
    }
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize store and signing errors
            AuthError::Database(_)
            | AuthError::Timeout(_)
            | AuthError::Encoding(_)
            | AuthError::UnsupportedAlgorithm(_)
            | AuthError::HashingFailed => "Internal server error".to_string(),
            // Same message for both so accounts can't be probed
            AuthError::NotFound | AuthError::InvalidPassword => {
                "Invalid email or password".to_string()
            }
            AuthError::IdentityRejected(_) => "Login failed: identity could not be verified".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether the error means the presented token is not a live session.
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, AuthError::Expired | AuthError::Invalid)
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_hides_internals() {
        let err = AuthError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.client_message(), "Internal server error");

        let err = AuthError::Timeout(Duration::from_secs(5));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_login_failures_share_a_message() {
        assert_eq!(
            AuthError::NotFound.client_message(),
            AuthError::InvalidPassword.client_message()
        );
    }

    #[test]
    fn test_token_errors_are_exposed() {
        assert_eq!(AuthError::Expired.client_message(), "Token has expired");
        assert_eq!(AuthError::Invalid.client_message(), "Invalid token");
        assert!(AuthError::Expired.is_token_rejection());
        assert!(!AuthError::Conflict.is_token_rejection());
    }

    #[test]
    fn test_timeout_conversion() {
        let err: AuthError = TimeoutError::Timeout(Duration::from_secs(2)).into();
        assert!(matches!(err, AuthError::Timeout(d) if d.as_secs() == 2));
    }
}
