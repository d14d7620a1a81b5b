//! Database layer: pool and the Postgres-backed membership and message stores.

mod pool;
mod repositories;

pub use pool::{create_pool, DbPool};
pub use repositories::*;
