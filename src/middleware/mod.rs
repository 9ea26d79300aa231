//! Middleware and extractors shared by the HTTP routes.

pub mod auth;

pub use auth::{require_app_key, AuthUser};
