//! Data models for users, posts, notification events, and presence.

pub mod event;
pub mod post;
pub mod presence;
pub mod user;

pub use event::*;
pub use post::*;
pub use presence::*;
pub use user::*;
