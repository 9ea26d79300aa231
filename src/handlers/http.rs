//! Shared state plus the operator broadcast and health endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::json;
use std::sync::Arc;

use crate::auth::JwtSecret;
use crate::config::Config;
use crate::db::DbPool;
use crate::error::AppError;
use crate::models::event::{BroadcastRequest, NotificationEvent, EVENT_BROADCAST};
use crate::services::{ConnectionTable, Notifier, PresenceRegistry, UploadStore};

/// Shared application state for HTTP and WS handlers.
#[derive(Clone)]
pub struct AppState {
    pub app_key: String,
    pub db: DbPool,
    pub jwt_secret: JwtSecret,
    pub presence: Arc<PresenceRegistry>,
    pub connections: Arc<ConnectionTable>,
    pub notifier: Notifier,
    pub uploads: UploadStore,
    pub mixed_feed_window: chrono::Duration,
}

impl AppState {
    /// Wire the realtime components together with the transport attached.
    pub fn new(db: DbPool, config: &Config) -> Self {
        let presence = Arc::new(PresenceRegistry::new());
        let connections = Arc::new(ConnectionTable::new());
        let notifier = Notifier::new(presence.clone());
        notifier.attach_transport(connections.clone());

        Self {
            app_key: config.app_key.clone(),
            db,
            jwt_secret: JwtSecret::new(config.jwt_secret.clone()),
            presence,
            connections,
            notifier,
            uploads: UploadStore::new(config.upload_dir.clone()),
            mixed_feed_window: chrono::Duration::minutes(config.mixed_feed_window_minutes),
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.db
    }
    pub fn jwt_secret(&self) -> &JwtSecret {
        &self.jwt_secret
    }
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }
}

/// POST /api/broadcast: push an event to every connected client. Requires `x-app-key`.
pub async fn broadcast(
    State(state): State<AppState>,
    Json(body): Json<BroadcastRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tag = body
        .event
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| EVENT_BROADCAST.to_string());
    let event = NotificationEvent::new(tag, body.data);
    let delivered = state.notifier().broadcast(&event).await?;

    Ok(Json(json!({
        "ok": true,
        "event": event.event,
        "delivered": delivered
    })))
}

/// GET /health: liveness check.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "starfeed",
            "online_users": state.presence.online_users().await,
            "connections": state.connections.len().await
        })),
    )
}
