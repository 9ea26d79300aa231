//! Notification fan-out: push events to the live connections of a set of users.
//!
//! Delivery is best-effort and at-most-once. Offline recipients are skipped,
//! nothing is queued for later, and a push never waits on the client.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::event::NotificationEvent;
use crate::models::presence::{ConnectionId, UserId};
use crate::services::connections::ConnectionTable;
use crate::services::presence::PresenceRegistry;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Fan-out was used before a transport was attached.
    #[error("notification transport not initialized")]
    NotInitialized,

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Resolves recipients through the presence registry and pushes to their connections.
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<PresenceRegistry>,
    transport: Arc<OnceLock<Arc<ConnectionTable>>>,
}

impl Notifier {
    pub fn new(registry: Arc<PresenceRegistry>) -> Self {
        Self {
            registry,
            transport: Arc::new(OnceLock::new()),
        }
    }

    /// Attach the transport's connection table. Only the first call takes
    /// effect; returns `false` if a transport was already attached.
    pub fn attach_transport(&self, connections: Arc<ConnectionTable>) -> bool {
        self.transport.set(connections).is_ok()
    }

    pub fn is_initialized(&self) -> bool {
        self.transport.get().is_some()
    }

    fn connections(&self) -> Result<&Arc<ConnectionTable>, NotifyError> {
        self.transport.get().ok_or(NotifyError::NotInitialized)
    }

    /// Push `event` to every connection of every recipient. Duplicate
    /// recipients are notified once. Returns the number of successful pushes.
    #[instrument(skip(self, recipients, event), fields(event = %event.event, recipients = recipients.len()))]
    pub async fn notify(
        &self,
        recipients: &[UserId],
        event: &NotificationEvent,
    ) -> Result<usize, NotifyError> {
        let connections = self.connections()?;
        let frame = serde_json::to_string(event)?;

        let mut seen = HashSet::new();
        let mut targets: Vec<ConnectionId> = Vec::new();
        for user_id in recipients {
            if !seen.insert(*user_id) {
                continue;
            }
            targets.extend(self.registry.get_connections(user_id).await);
        }

        let delivered = push_all(connections, &targets, &frame).await;
        debug!(delivered, "notify");
        Ok(delivered)
    }

    /// Convenience for a single recipient.
    pub async fn notify_user(
        &self,
        user_id: UserId,
        event: &NotificationEvent,
    ) -> Result<usize, NotifyError> {
        self.notify(&[user_id], event).await
    }

    /// Push `event` to every announced connection.
    #[instrument(skip(self, event), fields(event = %event.event))]
    pub async fn broadcast(&self, event: &NotificationEvent) -> Result<usize, NotifyError> {
        let connections = self.connections()?;
        let frame = serde_json::to_string(event)?;
        let targets = self.registry.all_connections().await;
        let delivered = push_all(connections, &targets, &frame).await;
        debug!(delivered, "broadcast");
        Ok(delivered)
    }
}

async fn push_all(connections: &ConnectionTable, targets: &[ConnectionId], frame: &str) -> usize {
    let mut delivered = 0;
    for (connection_id, sink) in connections.resolve(targets).await {
        if sink.push(frame) {
            delivered += 1;
        } else {
            debug!(connection_id = %connection_id, "push to closed connection dropped");
        }
    }
    delivered
}
