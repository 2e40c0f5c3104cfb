pub mod pool;
pub mod posts;
pub mod schema;
pub mod users;

pub use pool::{create_lazy_pool, create_pool, health_check, run_migrations};
