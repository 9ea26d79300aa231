//! Auth middleware: JWT extractor for user routes; app key for operator broadcast.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::auth::Identity;
use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::user::Role;

pub const HEADER_APP_KEY: &str = "x-app-key";
const BEARER_PREFIX: &str = "Bearer ";
const TOKEN_COOKIE: &str = "token";

/// Extractor: authenticated caller from a JWT in the `token` cookie or a Bearer header.
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Identity);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .or_else(|| bearer_token(parts).map(String::from))
            .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;
        let identity = state.jwt_secret().validate(&token)?;
        Ok(AuthUser(identity))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
}

/// Middleware: require `x-app-key` to match the configured operator key.
pub async fn require_app_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = request
        .headers()
        .get(HEADER_APP_KEY)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if key.is_empty() || key != state.app_key {
        debug!("rejected request: invalid or missing x-app-key");
        return AppError::Auth("invalid or missing x-app-key".to_string()).into_response();
    }

    next.run(request).await
}
