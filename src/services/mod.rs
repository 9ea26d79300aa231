//! Realtime presence and fan-out, plus feed and upload services.

pub mod connections;
pub mod feed;
pub mod notifier;
pub mod presence;
pub mod uploads;

pub use connections::{ConnectionTable, Outbound};
pub use notifier::{Notifier, NotifyError};
pub use presence::PresenceRegistry;
pub use uploads::UploadStore;
