// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers::{create_user, delete_user, get_user, health, list_users, update_user};
use crate::middleware::basic_auth;
use crate::AppState;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let users = Router::new()
        .route("/user", get(list_users).post(create_user))
        .route(
            "/user/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(from_fn_with_state(state.clone(), basic_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/v1", users)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
