//! Authentication module providing registration, login and session management.
//!
//! This module implements:
//! - HMAC-signed JWT access tokens with a configurable lifetime
//! - One live token per user, stored on the user record so it can be revoked
//! - Local accounts with Argon2id password hashing and a server-side pepper
//! - Federated login through an [`IdentityVerifier`], provisioning the user on first login
//!
//! ## Example
//!
//! ```no_run
//! use chrono::Duration;
//! use std::sync::Arc;
//! use user_login::auth::codec::Algorithm;
//! use user_login::auth::{PasswordHasher, RegisterRequest, SessionManager, TokenCodec};
//! use user_login::db::{Database, PgUserDirectory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let sessions = SessionManager::new(
//!         Arc::new(PgUserDirectory::new(db.pool().clone())),
//!         TokenCodec::new(b"jwt_secret", Algorithm::HS256, Duration::minutes(30))?,
//!         PasswordHasher::new("secret_pepper"),
//!     );
//!
//!     sessions
//!         .register(RegisterRequest {
//!             email: "player@example.com".to_string(),
//!             password: "SecurePass123".to_string(),
//!             display_name: "Player One".to_string(),
//!             steam_id: None,
//!         })
//!         .await?;
//!
//!     let login = sessions
//!         .login_with_credentials("player@example.com", "SecurePass123")
//!         .await?;
//!     let me = sessions.validate(&login.access_token).await?;
//!     println!("Logged in as {}", me.user_name);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod errors;
pub mod identity;
pub mod manager;
pub mod models;
pub mod password;

pub use codec::TokenCodec;
pub use errors::{AuthError, AuthResult};
pub use identity::{FirebaseVerifier, IdentityVerifier};
pub use manager::SessionManager;
pub use models::{
    LoginRequest, LoginResponse, MessageResponse, NewUser, RegisterRequest, Role, TokenClaims,
    UserId, UserInfo, UserRecord, VerifiedIdentity,
};
pub use password::PasswordHasher;
