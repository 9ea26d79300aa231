//! User directory and follow graph handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, UserRow};
use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::event::{NotificationEvent, UserEvent};
use crate::models::user::{UserListing, UserRef};
use crate::services::NotifyError;

#[derive(Debug, Serialize)]
pub struct FollowedCelebrity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// GET /api/users: everyone except the caller.
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<UserListing>>> {
    Ok(Json(db::users_list_except(state.db(), auth.id()).await?))
}

/// GET /api/users/all: every celebrity.
pub async fn list_celebrities(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<Vec<serde_json::Value>>> {
    let celebrities = db::celebrities_list(state.db()).await?;
    Ok(Json(
        celebrities
            .into_iter()
            .map(|UserRef { id, name }| json!({ "id": id, "name": name, "role": "celebrity" }))
            .collect(),
    ))
}

/// GET /api/users/following: celebrities the caller follows.
pub async fn list_following(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<FollowedCelebrity>>> {
    let rows = db::following_list(state.db(), auth.id()).await?;
    Ok(Json(
        rows.into_iter()
            .map(|(id, name, email)| FollowedCelebrity { id, name, email })
            .collect(),
    ))
}

/// POST /api/users/follow/:user_id
pub async fn follow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let target = celebrity_target(&state, auth.id(), target_id, "follow").await?;
    let follower = db::user_get_by_id(state.db(), auth.id())
        .await?
        .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

    if db::follow_insert(state.db(), follower.id, target.id).await? {
        info!(follower_id = %follower.id, celebrity_id = %target.id, "followed");
        let event = NotificationEvent::user(&UserEvent::Follow {
            follower_id: follower.id,
            follower_name: follower.name,
        })
        .map_err(NotifyError::Encode)?;
        state.notifier().notify_user(target.id, &event).await?;
    }

    Ok(Json(json!({ "message": "Followed successfully" })))
}

/// POST /api/users/unfollow/:user_id
pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let target = celebrity_target(&state, auth.id(), target_id, "unfollow").await?;
    if db::follow_delete(state.db(), auth.id(), target.id).await? {
        info!(follower_id = %auth.id(), celebrity_id = %target.id, "unfollowed");
    }
    Ok(Json(json!({ "message": "Unfollowed successfully" })))
}

/// Resolve a follow/unfollow target: never the caller, always an existing celebrity.
async fn celebrity_target(
    state: &AppState,
    caller: Uuid,
    target_id: Uuid,
    verb: &str,
) -> AppResult<UserRow> {
    if caller == target_id {
        return Err(AppError::Validation(format!("You can't {} yourself.", verb)));
    }
    match db::user_get_by_id(state.db(), target_id).await? {
        Some(target) if target.role().is_celebrity() => Ok(target),
        _ => {
            warn!(target_id = %target_id, verb, "target is not a celebrity");
            Err(AppError::Validation(format!(
                "Can only {} users with role \"celebrity\".",
                verb
            )))
        }
    }
}
