//! JWT issue and validation.

use crate::error::{AppError, AppResult};
use crate::models::user::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Caller identity carried by a valid token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Clone)]
pub struct JwtSecret {
    secret: String,
}

impl JwtSecret {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            exp: (now + Duration::days(TOKEN_LIFETIME_DAYS)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Jwt(e.to_string()))
    }

    pub fn validate(&self, token: &str) -> AppResult<Identity> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| AppError::Jwt(e.to_string()))?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|e| AppError::Jwt(e.to_string()))?;
        Ok(Identity {
            user_id,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates_to_same_identity() {
        let secret = JwtSecret::new("test-jwt-secret-min-32-chars!!!!".to_string());
        let user_id = Uuid::new_v4();
        let token = secret.issue(user_id, Role::Celebrity).unwrap();
        let identity = secret.validate(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, Role::Celebrity);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = JwtSecret::new("issuer-secret-issuer-secret-1234".to_string());
        let verifier = JwtSecret::new("verifier-secret-verifier-secret-".to_string());
        let token = issuer.issue(Uuid::new_v4(), Role::Public).unwrap();
        assert!(matches!(verifier.validate(&token), Err(AppError::Jwt(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let secret = JwtSecret::new("test-jwt-secret-min-32-chars!!!!".to_string());
        assert!(secret.validate("not.a.jwt").is_err());
    }
}
