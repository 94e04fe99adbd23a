//! In-process [`UserDirectory`] for tests and local runs without PostgreSQL.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::repository::UserDirectory;
use crate::auth::{AuthError, AuthResult, NewUser, UserId, UserRecord};

/// Records keyed by id; email uniqueness is enforced under the same lock.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<UserId, UserRecord>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a record, replacing any with the same id.
    pub fn with_user(self, user: UserRecord) -> Self {
        self.lock().insert(user.id, user);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove a record, as an administrator deleting an account would.
    pub fn remove(&self, user_id: UserId) -> Option<UserRecord> {
        self.lock().remove(&user_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, UserRecord>> {
        // A panic while holding the lock cannot leave a record half-written
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<UserRecord>> {
        Ok(self.lock().values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> AuthResult<Option<UserRecord>> {
        Ok(self.lock().get(&user_id).cloned())
    }

    async fn create(&self, user: NewUser) -> AuthResult<UserRecord> {
        let mut users = self.lock();
        if users.values().any(|u| u.email == user.email) {
            return Err(AuthError::Conflict);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            display_name: user.display_name,
            email: user.email,
            role: user.role,
            current_token: None,
            password_hash: user.password_hash,
            steam_id: user.steam_id,
            created_at: Utc::now(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn set_token(&self, user_id: UserId, token: &str) -> AuthResult<()> {
        if let Some(user) = self.lock().get_mut(&user_id) {
            user.current_token = Some(token.to_string());
        }
        Ok(())
    }

    async fn clear_token(&self, user_id: UserId, token: &str) -> AuthResult<()> {
        if let Some(user) = self
            .lock()
            .get_mut(&user_id)
            .filter(|u| u.current_token.as_deref() == Some(token))
        {
            user.current_token = None;
        }
        Ok(())
    }
}
