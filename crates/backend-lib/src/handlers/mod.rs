//! HTTP handlers.

pub mod users;

pub use users::{create_user, delete_user, get_user, list_users, update_user};

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
