// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";
pub const USER_CONFLICT: &str = "user.username_conflict";
pub const AUTH_SUCCESS: &str = "auth.success";
pub const AUTH_FAILURE: &str = "auth.failure";
pub const AUTH_FORBIDDEN: &str = "auth.forbidden";
