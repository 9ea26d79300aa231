//! Database layer: pool, migrations, and repositories for PostgreSQL.

mod pool;
mod posts;
mod repositories;

pub use pool::{create_pool, lazy_pool, run_migrations, DbPool};
pub use posts::*;
pub use repositories::*;
