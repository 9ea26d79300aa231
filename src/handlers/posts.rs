//! Post, like, and comment handlers. Every mutation ends with a push to the
//! owning celebrity's followers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{self, PostRow};
use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::middleware::AuthUser;
use crate::models::event::{NotificationEvent, PostEvent};
use crate::models::post::PostView;
use crate::services::{feed, NotifyError};

/// Fields of the multipart post form.
#[derive(Debug, Default)]
pub struct PostForm {
    pub caption: Option<String>,
    pub image: Option<(String, Vec<u8>)>,
}

impl PostForm {
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = PostForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid form: {}", e)))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("caption") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid caption: {}", e)))?;
                    form.caption = non_empty(&text);
                }
                Some("image") => {
                    let name = field.file_name().unwrap_or("image").to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("Invalid image: {}", e)))?;
                    if !bytes.is_empty() {
                        form.image = Some((name, bytes.to_vec()));
                    }
                }
                other => debug!(field = ?other, "ignoring form field"),
            }
        }
        Ok(form)
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Push a post change to the followers of `celebrity_id`.
async fn notify_followers(state: &AppState, celebrity_id: Uuid, change: &PostEvent) -> AppResult<()> {
    let followers = db::follower_ids(state.db(), celebrity_id).await?;
    let event = NotificationEvent::post(change).map_err(NotifyError::Encode)?;
    let delivered = state.notifier().notify(&followers, &event).await?;
    debug!(celebrity_id = %celebrity_id, followers = followers.len(), delivered, "post event fanned out");
    Ok(())
}

async fn existing_post(state: &AppState, id: Uuid) -> AppResult<PostRow> {
    db::post_get(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

async fn owned_post(state: &AppState, id: Uuid, caller: Uuid) -> AppResult<PostRow> {
    let post = existing_post(state, id).await?;
    if post.celebrity_id != caller {
        return Err(AppError::Forbidden("Unauthorized".to_string()));
    }
    Ok(post)
}

async fn view(state: &AppState, id: Uuid) -> AppResult<PostView> {
    db::post_view(state.db(), id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

// ---- Posts ----

/// POST /api/posts (multipart: caption, image)
pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PostView>)> {
    if !auth.role().is_celebrity() {
        return Err(AppError::Forbidden("Only celebrities can post".to_string()));
    }
    let form = PostForm::from_multipart(multipart).await?;
    let image = match &form.image {
        Some((name, bytes)) => Some(state.uploads().save(name, bytes).await?),
        None => None,
    };

    let row = state
        .uploads()
        .commit_swap(
            image.as_deref(),
            None,
            db::post_insert(state.db(), auth.id(), form.caption.as_deref(), image.as_deref()),
        )
        .await?;
    let post = view(&state, row.id).await?;
    info!(post_id = %post.id, celebrity_id = %auth.id(), "post created");

    notify_followers(&state, auth.id(), &PostEvent::Create { post: post.clone() }).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// GET /api/posts/self
pub async fn own_posts(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(feed::celebrity_feed(state.db(), auth.id()).await?))
}

/// GET /api/posts/feed
pub async fn following_feed(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(feed::following_feed(state.db(), auth.id()).await?))
}

/// GET /api/posts/feed/mixed
pub async fn mixed_feed(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<PostView>>> {
    let posts = feed::mixed_feed(
        state.db(),
        auth.id(),
        state.mixed_feed_window,
        chrono::Utc::now(),
    )
    .await?;
    Ok(Json(posts))
}

/// GET /api/posts/by/:user_id
pub async fn posts_by_celebrity(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(feed::celebrity_feed(state.db(), user_id).await?))
}

/// PUT /api/posts/:id (multipart: caption, image)
pub async fn update_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<PostView>> {
    let existing = owned_post(&state, id, auth.id()).await?;
    let form = PostForm::from_multipart(multipart).await?;

    let caption = form.caption.or(existing.caption);
    let stored = match &form.image {
        Some((name, bytes)) => Some(state.uploads().save(name, bytes).await?),
        None => None,
    };
    // the old file goes only once the row points at the new one
    let replaced = stored.as_ref().and(existing.image.as_deref());
    let image = stored.as_deref().or(existing.image.as_deref());

    state
        .uploads()
        .commit_swap(
            stored.as_deref(),
            replaced,
            db::post_update(state.db(), id, caption.as_deref(), image),
        )
        .await?;
    let post = view(&state, id).await?;
    info!(post_id = %id, "post updated");

    notify_followers(
        &state,
        auth.id(),
        &PostEvent::Update {
            post: post.clone(),
            deleted_comment_id: None,
        },
    )
    .await?;
    Ok(Json(post))
}

/// DELETE /api/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let post = owned_post(&state, id, auth.id()).await?;
    state
        .uploads()
        .commit_swap(None, post.image.as_deref(), db::post_delete(state.db(), id))
        .await?;
    info!(post_id = %id, "post deleted");

    notify_followers(
        &state,
        auth.id(),
        &PostEvent::Delete {
            post_id: id,
            celebrity_id: auth.id(),
        },
    )
    .await?;
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

// ---- Likes ----

/// POST /api/posts/:id/like: toggle the caller's like.
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let existing = existing_post(&state, id).await?;
    let liked = db::like_toggle(state.db(), id, auth.id()).await?;
    let post = view(&state, id).await?;
    debug!(post_id = %id, user_id = %auth.id(), liked, "like toggled");

    notify_followers(
        &state,
        existing.celebrity_id,
        &PostEvent::Update {
            post: post.clone(),
            deleted_comment_id: None,
        },
    )
    .await?;
    let message = if liked { "Post liked" } else { "Post unliked" };
    Ok(Json(json!({ "message": message, "post": post })))
}

// ---- Comments ----

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub text: String,
}

/// POST /api/posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let text = non_empty(&body.text)
        .ok_or_else(|| AppError::Validation("Comment text cannot be empty".to_string()))?;
    let existing = existing_post(&state, id).await?;

    let comment_id = db::comment_insert(state.db(), id, auth.id(), &text).await?;
    let post = view(&state, id).await?;
    let comment = post.comment(comment_id).cloned();

    notify_followers(
        &state,
        existing.celebrity_id,
        &PostEvent::Update {
            post: post.clone(),
            deleted_comment_id: None,
        },
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added successfully",
            "comment": comment,
            "post": post
        })),
    ))
}

/// DELETE /api/posts/:id/comments/:comment_id: comment author or post owner only.
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((post_id, comment_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let existing = existing_post(&state, post_id).await?;
    let comment = db::comment_get(state.db(), post_id, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
    if comment.user_id != auth.id() && existing.celebrity_id != auth.id() {
        return Err(AppError::Forbidden(
            "Not authorized to delete this comment".to_string(),
        ));
    }

    db::comment_delete(state.db(), comment_id).await?;
    let post = view(&state, post_id).await?;

    notify_followers(
        &state,
        existing.celebrity_id,
        &PostEvent::Update {
            post,
            deleted_comment_id: Some(comment_id),
        },
    )
    .await?;
    Ok(Json(json!({
        "message": "Comment deleted successfully",
        "postId": post_id,
        "commentId": comment_id
    })))
}
