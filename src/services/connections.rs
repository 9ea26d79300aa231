//! Live connection table: connection id → outbound queue.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::models::presence::ConnectionId;

/// Write side of one active connection. Pushing is fire-and-forget: the frame
/// is queued and the call never waits for the client.
pub trait Outbound: Send + Sync {
    /// Queue `frame` for delivery. Returns `false` if the connection is gone.
    fn push(&self, frame: &str) -> bool;
}

impl Outbound for mpsc::UnboundedSender<String> {
    fn push(&self, frame: &str) -> bool {
        self.send(frame.to_string()).is_ok()
    }
}

/// Every accepted connection's outbound queue, announced or not.
#[derive(Default)]
pub struct ConnectionTable {
    sinks: RwLock<HashMap<ConnectionId, Arc<dyn Outbound>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn attach(&self, connection_id: ConnectionId, sink: Arc<dyn Outbound>) {
        debug!(connection_id = %connection_id, "connection attached");
        self.sinks.write().await.insert(connection_id, sink);
    }

    pub async fn detach(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.sinks.write().await.remove(connection_id).is_some();
        if removed {
            debug!(connection_id = %connection_id, "connection detached");
        }
        removed
    }

    /// Resolve a batch of ids to sinks under one read lock; unknown ids are skipped.
    pub async fn resolve<'a, I>(&self, ids: I) -> Vec<(ConnectionId, Arc<dyn Outbound>)>
    where
        I: IntoIterator<Item = &'a ConnectionId>,
    {
        let sinks = self.sinks.read().await;
        ids.into_iter()
            .filter_map(|id| sinks.get(id).map(|sink| (id.clone(), sink.clone())))
            .collect()
    }

    /// Number of attached sockets, announced or not.
    pub async fn len(&self) -> usize {
        self.sinks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mpsc_sender_push_reports_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        assert!(tx.push("hello"));
        drop(rx);
        assert!(!tx.push("again"));
    }

    #[tokio::test]
    async fn resolve_skips_detached_connections() {
        let table = ConnectionTable::new();
        let (tx, _rx) = mpsc::unbounded_channel::<String>();
        let sink: Arc<dyn Outbound> = Arc::new(tx);
        table.attach(ConnectionId::from("c1"), sink.clone()).await;
        table.attach(ConnectionId::from("c2"), sink).await;
        assert!(table.detach(&ConnectionId::from("c2")).await);
        assert!(!table.detach(&ConnectionId::from("c2")).await);

        let wanted = [ConnectionId::from("c1"), ConnectionId::from("c2")];
        let resolved = table.resolve(wanted.iter()).await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, ConnectionId::from("c1"));
        assert_eq!(table.len().await, 1);
    }
}
