//! Post views: posts populated with their author, likes, and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRef;

/// A comment with its author resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: Uuid,
    pub user: UserRef,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A post with celebrity, likes, and comments populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub caption: Option<String>,
    /// Stored image filename, served under `/uploads/<image>`.
    pub image: Option<String>,
    pub celebrity: UserRef,
    pub likes: Vec<UserRef>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    pub fn liked_by(&self, user_id: Uuid) -> bool {
        self.likes.iter().any(|u| u.id == user_id)
    }

    pub fn comment(&self, comment_id: Uuid) -> Option<&CommentView> {
        self.comments.iter().find(|c| c.id == comment_id)
    }
}
