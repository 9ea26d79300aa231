//! Feed assembly: followed, per-celebrity, and mixed feeds.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::db::{self, DbPool, PostRow};
use crate::error::AppResult;
use crate::models::post::PostView;

/// Cap on the non-recent tail of the mixed feed.
pub const MIXED_FEED_TAIL: i64 = 50;

/// Posts of everyone `user_id` follows, newest first.
pub async fn following_feed(pool: &DbPool, user_id: Uuid) -> AppResult<Vec<PostView>> {
    let following = db::following_ids(pool, user_id).await?;
    let rows = db::posts_by_celebrities(pool, &following, None).await?;
    db::post_views(pool, rows).await
}

/// Posts of one celebrity, newest first.
pub async fn celebrity_feed(pool: &DbPool, celebrity_id: Uuid) -> AppResult<Vec<PostView>> {
    let rows = db::posts_by_celebrities(pool, &[celebrity_id], None).await?;
    db::post_views(pool, rows).await
}

/// Recent posts from followed celebrities first, then the newest other
/// celebrity posts, without repeats.
pub async fn mixed_feed(
    pool: &DbPool,
    user_id: Uuid,
    window: Duration,
    now: DateTime<Utc>,
) -> AppResult<Vec<PostView>> {
    let following = db::following_ids(pool, user_id).await?;
    let recent = db::posts_by_celebrities(pool, &following, Some(now - window)).await?;
    let recent_ids: Vec<Uuid> = recent.iter().map(|p| p.id).collect();
    let rest = db::celebrity_posts_excluding(pool, &recent_ids, MIXED_FEED_TAIL).await?;
    db::post_views(pool, merge_mixed(recent, rest)).await
}

/// Concatenate the recent head and the tail, dropping tail posts already in the head.
pub fn merge_mixed(recent: Vec<PostRow>, rest: Vec<PostRow>) -> Vec<PostRow> {
    let mut merged = recent;
    for row in rest {
        if !merged.iter().any(|p| p.id == row.id) {
            merged.push(row);
        }
    }
    merged
}
