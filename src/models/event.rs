//! Notification events and websocket wire messages.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::post::PostView;

/// Event tag for post changes pushed to followers.
pub const EVENT_NEW_POST: &str = "new-post";
/// Event tag for pushes addressed to a single user.
pub const EVENT_USER: &str = "user-event";
/// Default event tag for operator broadcasts.
pub const EVENT_BROADCAST: &str = "broadcast";

/// One event ready for fan-out: a tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event: String,
    pub data: serde_json::Value,
}

impl NotificationEvent {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Wrap a post change under the `new-post` tag.
    pub fn post(change: &PostEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EVENT_NEW_POST, serde_json::to_value(change)?))
    }

    /// Wrap a per-user event under the `user-event` tag.
    pub fn user(change: &UserEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::new(EVENT_USER, serde_json::to_value(change)?))
    }
}

/// Post change pushed to a celebrity's followers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PostEvent {
    Create {
        post: PostView,
    },
    Update {
        post: PostView,
        #[serde(rename = "deletedCommentId", skip_serializing_if = "Option::is_none")]
        deleted_comment_id: Option<Uuid>,
    },
    Delete {
        #[serde(rename = "postId")]
        post_id: Uuid,
        #[serde(rename = "celebrityId")]
        celebrity_id: Uuid,
    },
}

/// Event addressed to one user's sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    Follow {
        #[serde(rename = "followerId")]
        follower_id: Uuid,
        #[serde(rename = "followerName")]
        follower_name: String,
    },
}

/// Payload for the operator broadcast endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub event: Option<String>,
    pub data: serde_json::Value,
}

/// WebSocket client message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce which user this connection belongs to.
    Join { data: JoinPayload },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    pub user_id: Uuid,
}
