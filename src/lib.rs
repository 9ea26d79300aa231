//! Celebrity follow feed with real-time post notifications.
//!
//! Users register as `public` or `celebrity`, follow celebrities, and receive
//! post, like, and comment changes over WebSocket while they are connected.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::AppError;
pub use handlers::http::AppState;
pub use services::{Notifier, PresenceRegistry};

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use handlers::{http, posts, users};
use tower_http::services::ServeDir;

/// Largest accepted multipart upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the full router (auth, users, posts, ws, broadcast, health, uploads).
/// Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let user_routes = axum::Router::new()
        .route("/", get(users::list_users))
        .route("/all", get(users::list_celebrities))
        .route("/following", get(users::list_following))
        .route("/follow/:user_id", post(users::follow))
        .route("/unfollow/:user_id", post(users::unfollow));

    let post_routes = axum::Router::new()
        .route("/", post(posts::create_post))
        .route("/self", get(posts::own_posts))
        .route("/feed", get(posts::following_feed))
        .route("/feed/mixed", get(posts::mixed_feed))
        .route("/by/:user_id", get(posts::posts_by_celebrity))
        .route("/:id", axum::routing::put(posts::update_post).delete(posts::delete_post))
        .route("/:id/like", post(posts::toggle_like))
        .route("/:id/comments", post(posts::add_comment))
        .route("/:id/comments/:comment_id", delete(posts::delete_comment))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    let broadcast_route = axum::Router::new()
        .route("/broadcast", post(http::broadcast))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_app_key,
        ));

    let uploads = ServeDir::new(state.uploads().dir());

    axum::Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(http::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/posts", post_routes)
        .nest("/api", broadcast_route)
        .nest_service("/uploads", uploads)
        .with_state(state)
}
