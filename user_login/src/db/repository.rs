//! User directory: the store of user records and their current tokens.
//!
//! [`UserDirectory`] is the seam the session manager depends on;
//! [`PgUserDirectory`] is the PostgreSQL implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use std::time::Duration;
use uuid::Uuid;

use super::timeouts::{DEFAULT_QUERY_TIMEOUT, TimeoutError, with_timeout};
use crate::auth::{AuthError, AuthResult, NewUser, Role, UserId, UserRecord};

/// Trait for user record storage
///
/// Implementations hold no cache: each call observes the latest committed state.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find user by email
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>>;

    /// Create a user with a fresh ID and no token
    ///
    /// # Errors
    ///
    /// * `AuthError::Conflict` - Email already exists
    async fn create(&self, user: NewUser) -> AuthResult<UserRecord>;

    /// Overwrite the user's current token
    async fn set_token(&self, user_id: UserId, token: &str) -> AuthResult<()>;

    /// Clear the user's current token if it is still `token`, revoking the session
    ///
    /// A token that was already replaced is left untouched.
    async fn clear_token(&self, user_id: UserId, token: &str) -> AuthResult<()>;
}

const USER_COLUMNS: &str =
    "user_id, user_name, email, role, access_token, password_hash, steam_id, created_at";

/// PostgreSQL implementation of [`UserDirectory`]
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
    query_timeout: Duration,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

}

fn user_from_row(r: &PgRow) -> UserRecord {
    UserRecord {
        id: r.get("user_id"),
        display_name: r.get("user_name"),
        email: r.get("email"),
        // Unknown roles grant nothing beyond a regular user
        role: r.get::<String, _>("role").parse().unwrap_or(Role::User),
        current_token: r.get("access_token"),
        password_hash: r.get("password_hash"),
        steam_id: r.get("steam_id"),
        created_at: r.get("created_at"),
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_info WHERE email = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(email).fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user_info WHERE user_id = $1");
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&sql).bind(user_id).fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create(&self, user: NewUser) -> AuthResult<UserRecord> {
        let sql = format!(
            "INSERT INTO user_info (user_id, user_name, email, role, password_hash, steam_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );

        let result = with_timeout(
            self.query_timeout,
            sqlx::query(&sql)
                .bind(Uuid::new_v4())
                .bind(&user.display_name)
                .bind(&user.email)
                .bind(user.role.as_str())
                .bind(&user.password_hash)
                .bind(&user.steam_id)
                .fetch_one(&self.pool),
        )
        .await;

        match result {
            Ok(row) => Ok(user_from_row(&row)),
            Err(TimeoutError::Database(sqlx::Error::Database(e)))
                if e.is_unique_violation() =>
            {
                Err(AuthError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_token(&self, user_id: UserId, token: &str) -> AuthResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query("UPDATE user_info SET access_token = $1 WHERE user_id = $2")
                .bind(token)
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn clear_token(&self, user_id: UserId, token: &str) -> AuthResult<()> {
        with_timeout(
            self.query_timeout,
            sqlx::query(
                "UPDATE user_info SET access_token = NULL WHERE user_id = $1 AND access_token = $2",
            )
            .bind(user_id)
            .bind(token)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}
