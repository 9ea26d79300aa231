//! Presence registry: which users are online and through which connections.

use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::models::presence::{ConnectionId, UserId};

/// In-memory map of user → live connection ids.
///
/// A user present in the map always has at least one connection; removing the
/// last one drops the entry. Each mutation happens under a single write lock,
/// so readers never observe a half-updated set.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: RwLock<HashMap<UserId, HashSet<ConnectionId>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection_id` to the user's set. Returns `false` if it was already there.
    #[instrument(skip(self))]
    pub async fn register_connection(&self, user_id: UserId, connection_id: ConnectionId) -> bool {
        let mut entries = self.entries.write().await;
        let set = entries.entry(user_id).or_default();
        let first_session = set.is_empty();
        let inserted = set.insert(connection_id);
        if first_session {
            info!(user_id = %user_id, "user online");
        } else if inserted {
            debug!(user_id = %user_id, sessions = set.len(), "additional session");
        }
        inserted
    }

    /// Remove `connection_id` from every entry that holds it and drop entries
    /// left empty. Returns the users that went offline as a result.
    #[instrument(skip(self))]
    pub async fn remove_connection(&self, connection_id: &ConnectionId) -> Vec<UserId> {
        let mut entries = self.entries.write().await;
        let mut offline = Vec::new();
        entries.retain(|user_id, set| {
            if set.remove(connection_id) && set.is_empty() {
                offline.push(*user_id);
                return false;
            }
            true
        });
        for user_id in &offline {
            info!(user_id = %user_id, "user offline");
        }
        offline
    }

    /// Snapshot of the user's connections; empty when the user is offline.
    pub async fn get_connections(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        self.entries
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every announced connection, across all users.
    pub async fn all_connections(&self) -> Vec<ConnectionId> {
        self.entries
            .read()
            .await
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    pub async fn is_present(&self, user_id: &UserId) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    /// Number of users with at least one connection.
    pub async fn online_users(&self) -> usize {
        self.entries.read().await.len()
    }
}
