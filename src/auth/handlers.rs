//! Auth HTTP handlers: register, login.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::auth::AuthAppService;
use crate::db::{user_create, user_find_by_email};
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::user::{Role, UserProfile};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of both register and login responses.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    body.validate().map_err(|e| AppError::Validation(e.to_string()))?;
    AuthAppService::validate_email(&body.email)?;
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let password_hash = AuthAppService::hash_password(&body.password)?;
    let role = body.role.unwrap_or_default();
    let user = user_create(state.db(), &body.name, &body.email, &password_hash, role).await?;
    let token = state.jwt_secret().issue(user.id, user.role())?;
    info!(user_id = %user.id, role = %user.role(), "user registered");

    Ok(Json(AuthResponse {
        user: user.profile(),
        token,
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let found = user_find_by_email(state.db(), &body.email).await?;
    let user = AuthAppService::authenticate(found, &body.password)?;
    let token = state.jwt_secret().issue(user.id, user.role())?;

    Ok(Json(AuthResponse {
        user: user.profile(),
        token,
    }))
}
