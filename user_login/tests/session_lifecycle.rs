//! Integration tests for the session lifecycle.
//!
//! Covers registration, credential and federated login, logout, validation,
//! token rotation and revocation against the in-memory directory.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use user_login::auth::{
    AuthError, AuthResult, IdentityVerifier, PasswordHasher, RegisterRequest, Role,
    SessionManager, TokenCodec, UserRecord, VerifiedIdentity, codec::Algorithm,
};
use user_login::db::{MemoryUserDirectory, UserDirectory};
use uuid::Uuid;

const JWT_SECRET: &[u8] = b"test_secret_key_for_testing_only_0123456789";

/// Accepts assertions of the form `valid:<email>:<name>`
struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, assertion: &str) -> AuthResult<VerifiedIdentity> {
        let mut parts = assertion.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("valid"), Some(email), Some(name)) => Ok(VerifiedIdentity {
                email: email.to_string(),
                display_name: name.to_string(),
            }),
            _ => Err(AuthError::IdentityRejected("stub rejected assertion".to_string())),
        }
    }
}

fn codec() -> TokenCodec {
    TokenCodec::new(JWT_SECRET, Algorithm::HS256, Duration::minutes(30)).unwrap()
}

/// Helper to create a session manager over a fresh in-memory directory
fn setup() -> (SessionManager, Arc<MemoryUserDirectory>) {
    let directory = Arc::new(MemoryUserDirectory::new());
    let manager = SessionManager::new(directory.clone(), codec(), PasswordHasher::new("test_pepper"))
        .with_identity_verifier(Arc::new(StubVerifier));
    (manager, directory)
}

fn register_request(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: "SecurePass123".to_string(),
        display_name: "Test User".to_string(),
        steam_id: None,
    }
}

async fn stored_user(directory: &MemoryUserDirectory, email: &str) -> UserRecord {
    directory
        .find_by_email(email)
        .await
        .unwrap()
        .expect("user should exist")
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_register_creates_user_without_session() {
    let (manager, directory) = setup();

    let user = manager
        .register(register_request("Ada@Example.com"))
        .await
        .expect("Registration should succeed");

    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.role, Role::User);
    assert!(user.current_token.is_none());
    assert!(user.password_hash.is_some());
    assert_eq!(stored_user(&directory, "ada@example.com").await.id, user.id);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let (manager, _) = setup();
    manager.register(register_request("a@x.com")).await.unwrap();

    let result = manager.register(register_request("A@X.com")).await;

    assert!(matches!(result, Err(AuthError::Conflict)));
}

#[tokio::test]
async fn test_register_validation() {
    let (manager, _) = setup();

    let bad_email = manager.register(register_request("not-an-email")).await;
    assert!(matches!(bad_email, Err(AuthError::InvalidEmail)));

    let mut weak = register_request("weak@x.com");
    weak.password = "short".to_string();
    assert!(matches!(manager.register(weak).await, Err(AuthError::WeakPassword(_))));

    let long_email = format!("{}@x.com", "a".repeat(100));
    assert!(matches!(
        manager.register(register_request(&long_email)).await,
        Err(AuthError::InvalidEmail)
    ));

    let mut nameless = register_request("nameless@x.com");
    nameless.display_name = "   ".to_string();
    assert!(matches!(
        manager.register(nameless).await,
        Err(AuthError::InvalidDisplayName)
    ));
}

// ============================================================================
// Credential login
// ============================================================================

#[tokio::test]
async fn test_credential_login_then_validate() {
    let (manager, directory) = setup();
    let user = manager.register(register_request("a@x.com")).await.unwrap();

    let login = manager
        .login_with_credentials("a@x.com", "SecurePass123")
        .await
        .expect("Login should succeed");

    assert_eq!(login.token_type, "bearer");
    assert_eq!(
        stored_user(&directory, "a@x.com").await.current_token.as_deref(),
        Some(login.access_token.as_str())
    );

    let info = manager.validate(&login.access_token).await.unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.user_name, "Test User");
    assert_eq!(info.role, Role::User);
}

#[tokio::test]
async fn test_credential_login_unknown_email() {
    let (manager, _) = setup();

    let result = manager.login_with_credentials("nobody@x.com", "SecurePass123").await;

    assert!(matches!(result, Err(AuthError::NotFound)));
}

#[tokio::test]
async fn test_credential_login_wrong_password() {
    let (manager, directory) = setup();
    manager.register(register_request("a@x.com")).await.unwrap();

    let result = manager.login_with_credentials("a@x.com", "WrongPass123").await;

    assert!(matches!(result, Err(AuthError::InvalidPassword)));
    assert!(stored_user(&directory, "a@x.com").await.current_token.is_none());
}

#[tokio::test]
async fn test_credential_login_for_federated_only_account() {
    let (manager, _) = setup();
    manager.login_federated("valid:fed@x.com:Fed").await.unwrap();

    let result = manager.login_with_credentials("fed@x.com", "anything123").await;

    assert!(matches!(result, Err(AuthError::InvalidPassword)));
}

// ============================================================================
// Federated login
// ============================================================================

#[tokio::test]
async fn test_federated_login_provisions_user() {
    let (manager, directory) = setup();

    let login = manager.login_federated("valid:new@x.com:Newcomer").await.unwrap();

    let user = stored_user(&directory, "new@x.com").await;
    assert_eq!(user.display_name, "Newcomer");
    assert_eq!(user.role, Role::User);
    assert!(user.password_hash.is_none());

    let info = manager.validate(&login.access_token).await.unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.role, Role::User);
}

#[tokio::test]
async fn test_repeated_federated_login_reuses_user() {
    let (manager, directory) = setup();

    let first = manager.login_federated("valid:a@x.com:Ada").await.unwrap();
    let second = manager.login_federated("valid:a@x.com:Ada").await.unwrap();

    assert_ne!(first.access_token, second.access_token);
    assert_eq!(directory.len(), 1);

    let first_claims = manager.codec().decode(&first.access_token).unwrap();
    let second_claims = manager.codec().decode(&second.access_token).unwrap();
    assert_eq!(first_claims.sub, second_claims.sub);
}

#[tokio::test]
async fn test_federated_login_truncates_long_provider_name() {
    let (manager, directory) = setup();
    let long_name = "x".repeat(60);

    let login = manager
        .login_federated(&format!("valid:long@x.com:{long_name}"))
        .await
        .expect("Long provider name should not block login");

    let user = stored_user(&directory, "long@x.com").await;
    assert_eq!(user.display_name, "x".repeat(50));
    assert_eq!(manager.validate(&login.access_token).await.unwrap().user_id, user.id);
}

#[tokio::test]
async fn test_federated_login_rejects_overlong_email() {
    let (manager, directory) = setup();
    let email = format!("{}@x.com", "a".repeat(100));

    let result = manager.login_federated(&format!("valid:{email}:Ada")).await;

    assert!(matches!(result, Err(AuthError::IdentityRejected(_))));
    assert!(directory.is_empty());
}

#[tokio::test]
async fn test_federated_login_rejected_assertion() {
    let (manager, directory) = setup();

    let result = manager.login_federated("forged").await;

    assert!(matches!(result, Err(AuthError::IdentityRejected(_))));
    assert!(directory.is_empty());
}

#[tokio::test]
async fn test_federated_login_disabled_without_verifier() {
    let manager = SessionManager::new(
        Arc::new(MemoryUserDirectory::new()),
        codec(),
        PasswordHasher::new("test_pepper"),
    );

    let result = manager.login_federated("valid:a@x.com:Ada").await;

    assert!(matches!(result, Err(AuthError::FederatedLoginDisabled)));
}

#[tokio::test]
async fn test_concurrent_first_federated_logins_create_one_user() {
    let (manager, directory) = setup();
    let manager = Arc::new(manager);

    let mut handles = vec![];
    for _ in 0..10 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.login_federated("valid:race@x.com:Racer").await
        }));
    }

    let mut subjects = vec![];
    for handle in handles {
        let login = handle.await.unwrap().expect("Every login should succeed");
        // Later logins may already have superseded this token, so only decode it
        subjects.push(manager.codec().decode(&login.access_token).unwrap().sub);
    }

    assert_eq!(directory.len(), 1, "Exactly one record per email");
    assert!(subjects.windows(2).all(|w| w[0] == w[1]));
}

// ============================================================================
// Logout and revocation
// ============================================================================

#[tokio::test]
async fn test_logout_revokes_token() {
    let (manager, directory) = setup();
    let login = manager.login_federated("valid:a@x.com:Ada").await.unwrap();

    let message = manager.logout(&login.access_token).await.unwrap();
    assert_eq!(message.message, "User successfully logged out");
    assert!(stored_user(&directory, "a@x.com").await.current_token.is_none());

    assert!(matches!(
        manager.validate(&login.access_token).await,
        Err(AuthError::Invalid)
    ));
    assert!(matches!(
        manager.logout(&login.access_token).await,
        Err(AuthError::Invalid)
    ));
}

#[tokio::test]
async fn test_second_login_supersedes_first() {
    let (manager, _) = setup();
    manager.register(register_request("a@x.com")).await.unwrap();

    let t1 = manager
        .login_with_credentials("a@x.com", "SecurePass123")
        .await
        .unwrap()
        .access_token;
    let user_id = manager.validate(&t1).await.unwrap().user_id;

    let t2 = manager.login_federated("valid:a@x.com:Ada").await.unwrap().access_token;
    assert_ne!(t1, t2);

    assert!(matches!(manager.validate(&t1).await, Err(AuthError::Invalid)));
    let info = manager.validate(&t2).await.unwrap();
    assert_eq!(info.user_id, user_id);
}

#[tokio::test]
async fn test_logout_of_superseded_token_keeps_current_session() {
    let (manager, _) = setup();
    let t1 = manager.login_federated("valid:a@x.com:Ada").await.unwrap().access_token;
    let t2 = manager.login_federated("valid:a@x.com:Ada").await.unwrap().access_token;

    assert!(matches!(manager.logout(&t1).await, Err(AuthError::Invalid)));
    assert!(manager.validate(&t2).await.is_ok());
}

#[tokio::test]
async fn test_logout_for_deleted_user_is_invalid() {
    let (manager, directory) = setup();
    let login = manager.login_federated("valid:gone@x.com:Gone").await.unwrap();
    let user = stored_user(&directory, "gone@x.com").await;
    directory.remove(user.id);

    assert!(matches!(
        manager.logout(&login.access_token).await,
        Err(AuthError::Invalid)
    ));
}

#[tokio::test]
async fn test_token_for_unknown_subject_is_invalid() {
    let (manager, _) = setup();
    let orphan = codec().issue(Uuid::new_v4(), Role::Admin).unwrap();

    assert!(matches!(manager.validate(&orphan).await, Err(AuthError::Invalid)));
    assert!(matches!(manager.logout(&orphan).await, Err(AuthError::Invalid)));
}

// ============================================================================
// Codec errors propagate unchanged
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_reported_as_expired() {
    let (manager, directory) = setup();
    manager.login_federated("valid:a@x.com:Ada").await.unwrap();
    let user = stored_user(&directory, "a@x.com").await;

    // Even a token that is on record is dead once its time bound passes
    let expired = codec()
        .issue_with_ttl(user.id, user.role, Duration::zero())
        .unwrap();
    directory.set_token(user.id, &expired).await.unwrap();

    assert!(matches!(manager.validate(&expired).await, Err(AuthError::Expired)));
    assert!(matches!(manager.logout(&expired).await, Err(AuthError::Expired)));
}

#[tokio::test]
async fn test_foreign_token_is_invalid() {
    let (manager, _) = setup();
    manager.login_federated("valid:a@x.com:Ada").await.unwrap();

    let other = TokenCodec::new(b"some_other_secret", Algorithm::HS256, Duration::minutes(30)).unwrap();
    let forged = other.issue(Uuid::new_v4(), Role::Admin).unwrap();

    assert!(matches!(manager.validate(&forged).await, Err(AuthError::Invalid)));
    assert!(matches!(manager.validate("garbage").await, Err(AuthError::Invalid)));
}
