//! Integration tests for the PostgreSQL user directory.
//!
//! These need a reachable database (configured through `DATABASE_URL` or the
//! `DB_*` variables) and are ignored by default:
//!
//! ```bash
//! cargo test -p user_login --test postgres_directory -- --ignored
//! ```

use async_trait::async_trait;
use chrono::Duration;
use serial_test::serial;
use std::sync::Arc;
use user_login::auth::{
    AuthError, AuthResult, IdentityVerifier, NewUser, PasswordHasher, RegisterRequest, Role,
    SessionManager, TokenCodec, VerifiedIdentity, codec::Algorithm,
};
use user_login::db::{Database, DatabaseConfig, PgUserDirectory, UserDirectory};
use uuid::Uuid;

/// Helper to connect and migrate the test database
async fn setup_test_db() -> Database {
    let db = Database::new(&DatabaseConfig::from_env())
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to run migrations");
    db
}

/// Generate a unique email so reruns don't collide
fn unique_email(prefix: &str) -> String {
    format!("{}_{}@test.example", prefix, Uuid::new_v4().simple())
}

async fn cleanup_user(db: &Database, email: &str) {
    let _ = sqlx::query("DELETE FROM user_info WHERE email = $1")
        .bind(email)
        .execute(db.pool())
        .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_create_find_and_token_roundtrip() {
    let db = setup_test_db().await;
    let directory = PgUserDirectory::new(db.pool().clone());
    let email = unique_email("roundtrip");

    let created = directory
        .create(NewUser::federated(email.clone(), "Round Trip"))
        .await
        .expect("Create should succeed");
    assert_eq!(created.role, Role::User);
    assert!(created.current_token.is_none());

    let by_email = directory.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(by_email.id, created.id);

    directory.set_token(created.id, "token-1").await.unwrap();
    let by_id = directory.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(by_id.current_token.as_deref(), Some("token-1"));

    directory.set_token(created.id, "token-2").await.unwrap();
    directory.clear_token(created.id, "token-1").await.unwrap();
    let kept = directory.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(kept.current_token.as_deref(), Some("token-2"));

    directory.clear_token(created.id, "token-2").await.unwrap();
    let cleared = directory.find_by_id(created.id).await.unwrap().unwrap();
    assert!(cleared.current_token.is_none());

    cleanup_user(&db, &email).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_duplicate_email_conflicts() {
    let db = setup_test_db().await;
    let directory = PgUserDirectory::new(db.pool().clone());
    let email = unique_email("dup");

    directory
        .create(NewUser::federated(email.clone(), "First"))
        .await
        .unwrap();
    let result = directory.create(NewUser::federated(email.clone(), "Second")).await;

    assert!(matches!(result, Err(AuthError::Conflict)));
    cleanup_user(&db, &email).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_unknown_ids_are_absent_and_writes_are_noops() {
    let db = setup_test_db().await;
    let directory = PgUserDirectory::new(db.pool().clone());
    let missing = Uuid::new_v4();

    assert!(directory.find_by_id(missing).await.unwrap().is_none());
    assert!(directory.set_token(missing, "token").await.is_ok());
    assert!(directory.clear_token(missing, "token").await.is_ok());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_session_lifecycle_against_postgres() {
    let db = setup_test_db().await;
    let sessions = SessionManager::new(
        Arc::new(PgUserDirectory::new(db.pool().clone())),
        TokenCodec::new(
            b"test_secret_key_for_testing_only_0123456789",
            Algorithm::HS256,
            Duration::minutes(30),
        )
        .unwrap(),
        PasswordHasher::new("test_pepper_for_testing_only"),
    );
    let email = unique_email("lifecycle");

    sessions
        .register(RegisterRequest {
            email: email.clone(),
            password: "SecurePass123".to_string(),
            display_name: "Lifecycle".to_string(),
            steam_id: Some("76561197960287930".to_string()),
        })
        .await
        .expect("Registration should succeed");

    let t1 = sessions
        .login_with_credentials(&email, "SecurePass123")
        .await
        .unwrap()
        .access_token;
    let t2 = sessions
        .login_with_credentials(&email, "SecurePass123")
        .await
        .unwrap()
        .access_token;

    assert!(matches!(sessions.validate(&t1).await, Err(AuthError::Invalid)));
    assert_eq!(sessions.validate(&t2).await.unwrap().user_name, "Lifecycle");

    sessions.logout(&t2).await.unwrap();
    assert!(matches!(sessions.validate(&t2).await, Err(AuthError::Invalid)));

    cleanup_user(&db, &email).await;
}

/// Verifier that vouches for a fixed identity
struct FixedVerifier(VerifiedIdentity);

#[async_trait]
impl IdentityVerifier for FixedVerifier {
    async fn verify(&self, _assertion: &str) -> AuthResult<VerifiedIdentity> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_federated_login_fits_column_widths() {
    let db = setup_test_db().await;
    let email = unique_email("longname");
    let sessions = SessionManager::new(
        Arc::new(PgUserDirectory::new(db.pool().clone())),
        TokenCodec::new(
            b"test_secret_key_for_testing_only_0123456789",
            Algorithm::HS256,
            Duration::minutes(30),
        )
        .unwrap(),
        PasswordHasher::new("test_pepper_for_testing_only"),
    )
    .with_identity_verifier(Arc::new(FixedVerifier(VerifiedIdentity {
        email: email.clone(),
        display_name: "x".repeat(60),
    })));

    let login = sessions
        .login_federated("assertion")
        .await
        .expect("Long provider name should not block login");
    let info = sessions.validate(&login.access_token).await.unwrap();
    assert_eq!(info.user_name.chars().count(), 50);

    cleanup_user(&db, &email).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_register_rejects_email_wider_than_column() {
    let db = setup_test_db().await;
    let sessions = SessionManager::new(
        Arc::new(PgUserDirectory::new(db.pool().clone())),
        TokenCodec::new(
            b"test_secret_key_for_testing_only_0123456789",
            Algorithm::HS256,
            Duration::minutes(30),
        )
        .unwrap(),
        PasswordHasher::new("test_pepper_for_testing_only"),
    );
    let email = format!("{}@test.example", "a".repeat(100));

    let result = sessions
        .register(RegisterRequest {
            email: email.clone(),
            password: "SecurePass123".to_string(),
            display_name: "Wide".to_string(),
            steam_id: None,
        })
        .await;

    assert!(matches!(result, Err(AuthError::InvalidEmail)));
    cleanup_user(&db, &email).await;
}
