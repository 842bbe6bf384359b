// ============================
// crates/backend-lib/src/handlers/users.rs
// ============================
//! `/v1/user` handlers.
//!
//! Every handler runs behind [`basic_auth`](crate::middleware::basic_auth),
//! so a [`Principal`] is always present. Mutating handlers additionally
//! require the admin role, re-read from the store on each request.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use profile_saver_common::{UserPatchRequest, UserRequest, UserResponse};
use tracing::info;

use crate::auth::{Principal, Role};
use crate::error::AppError;
use crate::model::{NewUser, UserId, UserPatch};
use crate::AppState;

fn require_admin(state: &AppState, principal: &Principal) -> Result<(), AppError> {
    state.guard.authorize(&principal.username, Role::Admin)?;
    Ok(())
}

/// Unparseable ids cannot name a stored user
fn parse_id(raw: &str) -> Result<UserId, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

/// `POST /v1/user`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_admin(&state, &principal)?;
    if let Some(reason) = body.missing_fields() {
        return Err(AppError::InvalidInput(reason));
    }

    let repo = state.repo.clone();
    let new_user = NewUser::from(body);
    let user = tokio::task::spawn_blocking(move || repo.create_user(new_user)).await??;

    info!(by = %principal.username, user_id = %user.id, "user was created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// `GET /v1/user`
pub async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserResponse>> {
    let users = state.repo.get_all_users();
    Json(users.iter().map(UserResponse::from).collect())
}

/// `GET /v1/user/{id}`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.repo.get_user_by_id(&parse_id(&id)?)?;
    Ok(Json(UserResponse::from(&user)))
}

/// `PATCH /v1/user/{id}`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<UserPatchRequest>,
) -> Result<Json<UserResponse>, AppError> {
    require_admin(&state, &principal)?;
    let id = parse_id(&id)?;

    let repo = state.repo.clone();
    let patch = UserPatch::from(body);
    let user = tokio::task::spawn_blocking(move || repo.update_user(&id, patch)).await??;

    info!(by = %principal.username, user_id = %user.id, "user was updated");
    Ok(Json(UserResponse::from(&user)))
}

/// `DELETE /v1/user/{id}`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_admin(&state, &principal)?;
    let id = parse_id(&id)?;
    state.repo.delete_user(&id)?;

    info!(by = %principal.username, user_id = %id, "user was deleted");
    Ok(StatusCode::NO_CONTENT)
}
