//! Repositories: posts, likes, comments, and populated post views.

use crate::error::{AppError, AppResult};
use crate::models::post::{CommentView, PostView};
use crate::models::user::UserRef;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use super::DbPool;

// ---- Posts ----

#[derive(Debug, Clone, FromRow)]
pub struct PostRow {
    pub id: Uuid,
    pub celebrity_id: Uuid,
    pub celebrity_name: String,
    pub caption: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.celebrity_id, u.name AS celebrity_name, p.caption, p.image, p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.celebrity_id
"#;

pub async fn post_insert(
    pool: &DbPool,
    celebrity_id: Uuid,
    caption: Option<&str>,
    image: Option<&str>,
) -> AppResult<PostRow> {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO posts (celebrity_id, caption, image) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(celebrity_id)
    .bind(caption)
    .bind(image)
    .fetch_one(pool)
    .await?;
    post_get(pool, id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("post {} vanished after insert", id)))
}

pub async fn post_get(pool: &DbPool, id: Uuid) -> AppResult<Option<PostRow>> {
    let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn post_update(
    pool: &DbPool,
    id: Uuid,
    caption: Option<&str>,
    image: Option<&str>,
) -> AppResult<()> {
    let r = sqlx::query(
        "UPDATE posts SET caption = $2, image = $3, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(caption)
    .bind(image)
    .execute(pool)
    .await?;
    if r.rows_affected() == 0 {
        return Err(AppError::NotFound("Post not found".to_string()));
    }
    Ok(())
}

pub async fn post_delete(pool: &DbPool, id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Posts by any of `celebrity_ids`, newest first, optionally only those created at or after `since`.
pub async fn posts_by_celebrities(
    pool: &DbPool,
    celebrity_ids: &[Uuid],
    since: Option<DateTime<Utc>>,
) -> AppResult<Vec<PostRow>> {
    if celebrity_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"{POST_SELECT}
        WHERE p.celebrity_id = ANY($1)
          AND ($2::timestamptz IS NULL OR p.created_at >= $2)
        ORDER BY p.created_at DESC, p.id DESC
        "#
    ))
    .bind(celebrity_ids)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Newest celebrity posts not in `exclude`, capped at `limit`.
pub async fn celebrity_posts_excluding(
    pool: &DbPool,
    exclude: &[Uuid],
    limit: i64,
) -> AppResult<Vec<PostRow>> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"{POST_SELECT}
        WHERE u.role = 'celebrity'
          AND NOT (p.id = ANY($1))
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT $2
        "#
    ))
    .bind(exclude)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

// ---- Likes ----

/// Flip `user_id`'s like on the post. Returns `true` if the post is now liked.
///
/// Runs in one transaction holding the post row lock, so concurrent toggles
/// on the same post are applied one after the other.
pub async fn like_toggle(pool: &DbPool, post_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let mut tx = pool.begin().await?;
    sqlx::query("SELECT 1 FROM posts WHERE id = $1 FOR UPDATE")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;
    let inserted = sqlx::query(
        "INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(post_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;
    let liked = inserted.rows_affected() > 0;
    if !liked {
        sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(liked)
}

// ---- Comments ----

#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, u.name AS user_name, c.text, c.created_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

pub async fn comment_insert(
    pool: &DbPool,
    post_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> AppResult<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO comments (post_id, user_id, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(text)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn comment_get(
    pool: &DbPool,
    post_id: Uuid,
    comment_id: Uuid,
) -> AppResult<Option<CommentRow>> {
    let row = sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.post_id = $1 AND c.id = $2"
    ))
    .bind(post_id)
    .bind(comment_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn comment_delete(pool: &DbPool, comment_id: Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- Populated views ----

#[derive(Debug, Clone, FromRow)]
pub struct LikeRow {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
}

/// Load likes and comments for `posts` and assemble populated views, preserving input order.
pub async fn post_views(pool: &DbPool, posts: Vec<PostRow>) -> AppResult<Vec<PostView>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

    let likes = sqlx::query_as::<_, LikeRow>(
        r#"
        SELECT l.post_id, l.user_id, u.name AS user_name
        FROM post_likes l
        JOIN users u ON u.id = l.user_id
        WHERE l.post_id = ANY($1)
        ORDER BY l.created_at
        "#,
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let comments = sqlx::query_as::<_, CommentRow>(&format!(
        "{COMMENT_SELECT} WHERE c.post_id = ANY($1) ORDER BY c.created_at, c.id"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(assemble_views(posts, likes, comments))
}

pub async fn post_view(pool: &DbPool, id: Uuid) -> AppResult<Option<PostView>> {
    let Some(row) = post_get(pool, id).await? else {
        return Ok(None);
    };
    Ok(post_views(pool, vec![row]).await?.pop())
}

fn assemble_views(posts: Vec<PostRow>, likes: Vec<LikeRow>, comments: Vec<CommentRow>) -> Vec<PostView> {
    let mut likes_by_post: HashMap<Uuid, Vec<UserRef>> = HashMap::new();
    for like in likes {
        likes_by_post.entry(like.post_id).or_default().push(UserRef {
            id: like.user_id,
            name: like.user_name,
        });
    }
    let mut comments_by_post: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
    for c in comments {
        comments_by_post.entry(c.post_id).or_default().push(CommentView {
            id: c.id,
            user: UserRef {
                id: c.user_id,
                name: c.user_name,
            },
            text: c.text,
            created_at: c.created_at,
        });
    }

    posts
        .into_iter()
        .map(|p| PostView {
            likes: likes_by_post.remove(&p.id).unwrap_or_default(),
            comments: comments_by_post.remove(&p.id).unwrap_or_default(),
            id: p.id,
            caption: p.caption,
            image: p.image,
            celebrity: UserRef {
                id: p.celebrity_id,
                name: p.celebrity_name,
            },
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(name: &str) -> PostRow {
        PostRow {
            id: Uuid::new_v4(),
            celebrity_id: Uuid::new_v4(),
            celebrity_name: name.to_string(),
            caption: Some(format!("{} says hi", name)),
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn assemble_groups_likes_and_comments_per_post() {
        let first = post("ada");
        let second = post("grace");
        let fan = Uuid::new_v4();
        let likes = vec![LikeRow {
            post_id: second.id,
            user_id: fan,
            user_name: "fan".into(),
        }];
        let comments = vec![
            CommentRow {
                id: Uuid::new_v4(),
                post_id: first.id,
                user_id: fan,
                user_name: "fan".into(),
                text: "first!".into(),
                created_at: Utc::now(),
            },
            CommentRow {
                id: Uuid::new_v4(),
                post_id: first.id,
                user_id: fan,
                user_name: "fan".into(),
                text: "second".into(),
                created_at: Utc::now(),
            },
        ];

        let views = assemble_views(vec![first.clone(), second.clone()], likes, comments);

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, first.id);
        assert_eq!(views[0].celebrity.name, "ada");
        assert!(views[0].likes.is_empty());
        assert_eq!(
            views[0].comments.iter().map(|c| c.text.as_str()).collect::<Vec<_>>(),
            vec!["first!", "second"]
        );
        assert_eq!(views[1].id, second.id);
        assert!(views[1].liked_by(fan));
        assert!(views[1].comments.is_empty());
    }
}
