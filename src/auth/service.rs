//! Auth application service: password hashing and credential checks.

use crate::db::UserRow;
use crate::error::{AppError, AppResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use validator::ValidateEmail;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AuthAppService;

impl AuthAppService {
    pub fn hash_password(password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("hash: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("parse hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn validate_email(email: &str) -> AppResult<()> {
        if !email.trim().validate_email() {
            return Err(AppError::Validation("Invalid email".to_string()));
        }
        Ok(())
    }

    /// Check a login attempt. Unknown email and wrong password produce the same error.
    pub fn authenticate(user: Option<UserRow>, password: &str) -> AppResult<UserRow> {
        let user = user.ok_or_else(|| AppError::Auth(INVALID_CREDENTIALS.to_string()))?;
        if !Self::verify_password(password, &user.password_hash)? {
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }
        Ok(user)
    }
}
