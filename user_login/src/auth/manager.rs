//! Session manager: login, logout and token validation.
//!
//! A (user, token) pair is in one of four states:
//!
//! - **NoSession**: no record, or the record holds no token
//! - **Active**: token decodes and equals the record's current token
//! - **Expired**: token no longer decodes because its time bound elapsed
//! - **Revoked**: token decodes but the record holds a different token or none
//!
//! Only login leaves the terminal states. Each login overwrites the stored
//! token, so a user has at most one active session.

use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::{
    codec::TokenCodec,
    errors::{AuthError, AuthResult},
    identity::{DEFAULT_DISPLAY_NAME, IdentityVerifier},
    models::{
        LoginResponse, MessageResponse, NewUser, RegisterRequest, Role, UserInfo, UserRecord,
        normalize_email,
    },
    password::PasswordHasher,
};
use crate::db::UserDirectory;

/// Confirmation returned by a successful logout
pub const LOGOUT_MESSAGE: &str = "User successfully logged out";

/// Matches the `user_name` column width
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Matches the `email` column width
pub const MAX_EMAIL_LEN: usize = 100;

/// Session manager
#[derive(Clone)]
pub struct SessionManager {
    directory: Arc<dyn UserDirectory>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl SessionManager {
    /// Create a session manager
    ///
    /// # Arguments
    ///
    /// * `directory` - Store of user records
    /// * `codec` - Access token codec
    /// * `hasher` - Password hasher for local accounts
    ///
    /// Federated login stays disabled until a verifier is attached with
    /// [`SessionManager::with_identity_verifier`].
    pub fn new(directory: Arc<dyn UserDirectory>, codec: TokenCodec, hasher: PasswordHasher) -> Self {
        Self {
            directory,
            codec,
            hasher,
            verifier: None,
        }
    }

    pub fn with_identity_verifier(mut self, verifier: Arc<dyn IdentityVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn federated_login_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a local account
    ///
    /// The new record has role `user` and no session.
    ///
    /// # Errors
    ///
    /// * `AuthError::InvalidEmail` - Email is not well formed
    /// * `AuthError::WeakPassword` - Password too weak
    /// * `AuthError::Conflict` - Email already registered
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<UserRecord> {
        let email = normalize_email(&request.email);
        validate_email(&email)?;
        PasswordHasher::validate_strength(&request.password)?;

        let display_name = request.display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(AuthError::InvalidDisplayName);
        }

        if self.directory.find_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hasher.hash(&request.password)?;
        let user = self
            .directory
            .create(NewUser {
                email,
                display_name: display_name.to_string(),
                role: Role::User,
                password_hash: Some(password_hash),
                steam_id: request.steam_id.filter(|s| !s.trim().is_empty()),
            })
            .await?;

        log::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Login with email and password
    ///
    /// # Errors
    ///
    /// * `AuthError::NotFound` - No account for the email
    /// * `AuthError::InvalidPassword` - Wrong password, or the account has no local password
    pub async fn login_with_credentials(&self, email: &str, password: &str) -> AuthResult<LoginResponse> {
        let user = self
            .directory
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::NotFound)?;

        let hash = user.password_hash.as_deref().ok_or(AuthError::InvalidPassword)?;
        self.hasher.verify(password, hash)?;

        self.start_session(&user).await
    }

    /// Login with an identity provider assertion, provisioning the user on
    /// first login.
    ///
    /// Repeated logins for the same email reuse the same record and only
    /// rotate its token.
    ///
    /// # Errors
    ///
    /// * `AuthError::FederatedLoginDisabled` - No verifier configured
    /// * `AuthError::IdentityRejected` - Assertion failed verification
    pub async fn login_federated(&self, assertion: &str) -> AuthResult<LoginResponse> {
        let verifier = self.verifier.as_ref().ok_or(AuthError::FederatedLoginDisabled)?;
        let identity = verifier.verify(assertion).await?;
        let email = normalize_email(&identity.email);
        if email.chars().count() > MAX_EMAIL_LEN {
            return Err(AuthError::IdentityRejected("email too long".to_string()));
        }

        let user = match self.directory.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                let display_name = federated_display_name(&identity.display_name);
                match self
                    .directory
                    .create(NewUser::federated(email.clone(), display_name))
                    .await
                {
                    Ok(user) => {
                        log::info!("Provisioned federated user {}", user.id);
                        user
                    }
                    // A concurrent first login created the record
                    Err(AuthError::Conflict) => self
                        .directory
                        .find_by_email(&email)
                        .await?
                        .ok_or(AuthError::Conflict)?,
                    Err(e) => return Err(e),
                }
            }
        };

        self.start_session(&user).await
    }

    /// Revoke the session the token belongs to
    ///
    /// # Errors
    ///
    /// * `AuthError::Expired` - Token expired
    /// * `AuthError::Invalid` - Token malformed, revoked, superseded, or its user is gone
    pub async fn logout(&self, token: &str) -> AuthResult<MessageResponse> {
        let user = self.current_session_owner(token).await?;
        // Only clears if no newer login replaced the token in the meantime
        self.directory.clear_token(user.id, token).await?;

        log::info!("User {} logged out", user.id);
        Ok(MessageResponse {
            message: LOGOUT_MESSAGE.to_string(),
        })
    }

    /// Check that the token is the live session of an existing user
    ///
    /// # Errors
    ///
    /// * `AuthError::Expired` - Token expired
    /// * `AuthError::Invalid` - Token malformed, revoked, superseded, or its user is gone
    pub async fn validate(&self, token: &str) -> AuthResult<UserInfo> {
        let user = self.current_session_owner(token).await?;
        Ok(UserInfo::from(&user))
    }

    async fn start_session(&self, user: &UserRecord) -> AuthResult<LoginResponse> {
        let token = self.codec.issue(user.id, user.role)?;
        self.directory.set_token(user.id, &token).await?;
        Ok(LoginResponse::bearer(token))
    }

    /// Decode the token and return its owner if the token is still the one on record.
    async fn current_session_owner(&self, token: &str) -> AuthResult<UserRecord> {
        let claims = self.codec.decode(token)?;

        let user = self
            .directory
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::Invalid)?;

        let is_current = user
            .current_token
            .as_deref()
            .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(token.as_bytes())));

        if !is_current {
            return Err(AuthError::Invalid);
        }

        Ok(user)
    }
}

/// Provider names are free text; cut them to the column width.
fn federated_display_name(name: &str) -> String {
    let name: String = name.trim().chars().take(MAX_DISPLAY_NAME_LEN).collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Minimal structural check: one `@`, non-empty local part, dotted domain.
fn validate_email(email: &str) -> AuthResult<()> {
    let (local, domain) = email.split_once('@').ok_or(AuthError::InvalidEmail)?;

    let valid = email.chars().count() <= MAX_EMAIL_LEN
        && !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    if valid { Ok(()) } else { Err(AuthError::InvalidEmail) }
}
