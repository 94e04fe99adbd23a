//! Verification of federated identity assertions.
//!
//! The session manager only depends on [`IdentityVerifier`]. [`FirebaseVerifier`]
//! checks Firebase ID tokens (what the Google sign-in front end sends) against
//! the public keys Google publishes for the project.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::{
    errors::{AuthError, AuthResult},
    models::VerifiedIdentity,
};

/// Display name used when the provider does not supply one
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// Google's JWKS endpoint for Firebase ID token signing keys
pub const FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

/// How long fetched signing keys are reused before refetching
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Validates an identity assertion issued by an external provider.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify the assertion and return the identity it proves.
    ///
    /// # Errors
    ///
    /// * `AuthError::IdentityRejected` - Assertion is not valid for this service
    async fn verify(&self, assertion: &str) -> AuthResult<VerifiedIdentity>;
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    name: Option<String>,
}

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens for a single project
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    client: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            jwks_url: FIREBASE_JWKS_URL.to_string(),
            client: reqwest::Client::new(),
            keys: RwLock::new(None),
        }
    }

    /// Use a different key endpoint (e.g. the Firebase auth emulator).
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    /// Seed the key cache instead of fetching on first use.
    pub fn with_keys(self, keys: JwkSet) -> Self {
        Self {
            keys: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
            ..self
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    async fn fetch_keys(&self) -> AuthResult<JwkSet> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                log::warn!("Failed to fetch identity provider keys: {}", e);
                AuthError::IdentityRejected("signing keys unavailable".to_string())
            })?;

        response.json::<JwkSet>().await.map_err(|e| {
            log::warn!("Identity provider returned malformed keys: {}", e);
            AuthError::IdentityRejected("signing keys unavailable".to_string())
        })
    }

    /// Find the key for `kid`, refetching once if the cache is stale or the
    /// key is unknown (providers rotate keys).
    async fn decoding_key(&self, kid: &str) -> AuthResult<DecodingKey> {
        {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < KEY_CACHE_TTL {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return DecodingKey::from_jwk(jwk)
                            .map_err(|e| AuthError::IdentityRejected(e.to_string()));
                    }
                }
            }
        }

        let keys = self.fetch_keys().await?;
        let key = keys
            .find(kid)
            .map(DecodingKey::from_jwk)
            .transpose()
            .map_err(|e| AuthError::IdentityRejected(e.to_string()))?;

        *self.keys.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.ok_or_else(|| AuthError::IdentityRejected("unknown signing key".to_string()))
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, assertion: &str) -> AuthResult<VerifiedIdentity> {
        let header = decode_header(assertion)
            .map_err(|_| AuthError::IdentityRejected("malformed ID token".to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AuthError::IdentityRejected(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::IdentityRejected("missing key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);

        let claims = decode::<FirebaseClaims>(assertion, &key, &validation)
            .map_err(|e| AuthError::IdentityRejected(e.to_string()))?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::IdentityRejected("empty subject".to_string()));
        }
        if claims.email_verified == Some(false) {
            return Err(AuthError::IdentityRejected("email not verified".to_string()));
        }
        let email = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AuthError::IdentityRejected("no email in ID token".to_string()))?;

        Ok(VerifiedIdentity {
            email,
            display_name: claims
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn verifier() -> FirebaseVerifier {
        FirebaseVerifier::new("demo-project").with_keys(JwkSet { keys: vec![] })
    }

    #[tokio::test]
    async fn test_rejects_malformed_assertion() {
        let result = verifier().verify("definitely.not.a-jwt").await;
        assert!(matches!(result, Err(AuthError::IdentityRejected(_))));
    }

    #[tokio::test]
    async fn test_rejects_symmetric_tokens() {
        let token = encode(
            &Header::default(),
            &serde_json::json!({"sub": "abc", "email": "a@x.com", "exp": 4_000_000_000i64}),
            &EncodingKey::from_secret(b"forged"),
        )
        .unwrap();

        let result = verifier().verify(&token).await;
        assert!(matches!(result, Err(AuthError::IdentityRejected(_))));
    }

    #[test]
    fn test_issuer_uses_project_id() {
        assert_eq!(
            verifier().issuer(),
            "https://securetoken.google.com/demo-project"
        );
    }
}
