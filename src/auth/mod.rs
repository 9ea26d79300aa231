//! Authentication: register, login, JWT.

mod handlers;
mod jwt;
mod service;

pub use handlers::{login, register};
pub use jwt::{Claims, Identity, JwtSecret};
pub use service::AuthAppService;
