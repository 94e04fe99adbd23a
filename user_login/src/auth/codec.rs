//! Signed, time-bound access tokens.
//!
//! Tokens are HMAC-signed JWTs carrying the subject id, role, issue time,
//! expiry and a random `jti`. Expiry is checked here; whether a token is still
//! the user's current one is the session manager's concern.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use uuid::Uuid;

pub use jsonwebtoken::Algorithm;

use super::{
    errors::{AuthError, AuthResult},
    models::{Role, TokenClaims, UserId},
};

/// Default access token lifetime
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

/// Encodes and decodes access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    default_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Create a codec
    ///
    /// # Arguments
    ///
    /// * `secret` - Shared signing secret
    /// * `algorithm` - HMAC algorithm (HS256, HS384 or HS512)
    /// * `default_ttl` - Lifetime used by [`TokenCodec::issue`]
    ///
    /// # Errors
    ///
    /// * `AuthError::UnsupportedAlgorithm` - Algorithm needs a key pair, or the secret is empty
    pub fn new(secret: &[u8], algorithm: Algorithm, default_ttl: Duration) -> AuthResult<Self> {
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        if secret.is_empty() {
            return Err(AuthError::UnsupportedAlgorithm(
                "empty signing secret".to_string(),
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm,
            default_ttl,
        })
    }

    /// Parse an algorithm identifier such as `"HS256"`.
    pub fn parse_algorithm(name: &str) -> AuthResult<Algorithm> {
        name.trim()
            .parse::<Algorithm>()
            .map_err(|_| AuthError::UnsupportedAlgorithm(name.to_string()))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issue a token that expires after the default TTL.
    pub fn issue(&self, subject: UserId, role: Role) -> AuthResult<String> {
        self.issue_with_ttl(subject, role, self.default_ttl)
    }

    /// Issue a token that expires `ttl` from now. A zero or negative TTL yields
    /// a token that is already expired.
    pub fn issue_with_ttl(&self, subject: UserId, role: Role, ttl: Duration) -> AuthResult<String> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Encoding(ErrorKind::InvalidToken.into()))?;

        let claims = TokenClaims {
            sub: subject,
            role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(AuthError::Encoding)
    }

    /// Verify signature and expiry and return the claims.
    ///
    /// # Errors
    ///
    /// * `AuthError::Expired` - Current time is at or past `exp`
    /// * `AuthError::Invalid` - Bad signature, wrong algorithm, or malformed token
    pub fn decode(&self, token: &str) -> AuthResult<TokenClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid,
            }
        })?;

        // The library only rejects exp < now; a token is dead from the second it expires.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }
}
