//! # User Login
//!
//! Session-token lifecycle for user login services: issuing, validating and
//! revoking bearer tokens that are tied to a persisted user record.
//!
//! A token is live only while two things hold:
//!
//! - its signature verifies and its expiry has not passed (checked by
//!   [`auth::TokenCodec`])
//! - it is still the token stored on its user's record (checked by
//!   [`auth::SessionManager`] against the [`db::UserDirectory`])
//!
//! Logging in stores a fresh token on the record, which revokes the previous
//! one; logging out clears it.
//!
//! ## Core Modules
//!
//! - [`auth`]: Token codec, session manager, password hashing, identity verification
//! - [`db`]: PostgreSQL pool, migrations and user directory implementations
//! - [`steam`]: Steam Web API profile lookup
//!
//! ## Example
//!
//! ```
//! use chrono::Duration;
//! use std::sync::Arc;
//! use user_login::auth::{PasswordHasher, SessionManager, TokenCodec, codec::Algorithm};
//! use user_login::db::MemoryUserDirectory;
//!
//! let codec = TokenCodec::new(b"change-me", Algorithm::HS256, Duration::minutes(30)).unwrap();
//! let sessions = SessionManager::new(
//!     Arc::new(MemoryUserDirectory::new()),
//!     codec,
//!     PasswordHasher::new("pepper"),
//! );
//! assert!(!sessions.federated_login_enabled());
//! ```

pub mod auth;
pub mod db;
pub mod steam;

pub use auth::{AuthError, AuthResult, SessionManager};
pub use db::{Database, DatabaseConfig, UserDirectory};
