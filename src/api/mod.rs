pub mod auth;
pub mod health;
pub mod posts;
pub mod response;
pub mod routes;
pub mod users;

pub use routes::{create_router, AppState};
