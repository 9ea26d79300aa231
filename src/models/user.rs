//! User roles and public user representations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account role. Only celebrities can be followed and publish posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Public,
    Celebrity,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Public => "public",
            Role::Celebrity => "celebrity",
        }
    }

    pub fn is_celebrity(&self) -> bool {
        matches!(self, Role::Celebrity)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Role::Public),
            "celebrity" => Ok(Role::Celebrity),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// User as returned by auth endpoints (never includes the password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Entry of `GET /api/users`.
#[derive(Debug, Clone, Serialize)]
pub struct UserListing {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub followers: Vec<Uuid>,
}

/// Minimal user reference embedded in posts, likes and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
}
