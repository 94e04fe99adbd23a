//! Argon2id password hashing with a server-side pepper.

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};

use super::errors::{AuthError, AuthResult};

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Hashes and verifies local account passwords
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
}

impl PasswordHasher {
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
        }
    }

    /// Hash password with Argon2id + pepper
    pub fn hash(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    pub fn verify(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidPassword)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidPassword)
    }

    /// Validate password strength
    pub fn validate_strength(password: &str) -> AuthResult<()> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        let has_letter = password.chars().any(|c| c.is_alphabetic());

        if !has_digit || !has_letter {
            return Err(AuthError::WeakPassword(
                "Password must contain at least one letter and one number".to_string(),
            ));
        }

        Ok(())
    }
}
