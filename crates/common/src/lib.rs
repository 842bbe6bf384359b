// ================
// crates/common/src/lib.rs
// ================
//! Wire types shared between the profile-saver HTTP boundary and its clients.
//!
//! These mirror the JSON bodies accepted and returned under `/v1/user`.
//! Password material only ever travels inbound; responses never carry a
//! digest or salt.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/user`
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Grants admin privilege to the new account
    #[serde(default)]
    pub admin: bool,
}

impl UserRequest {
    /// Collect the reasons this request cannot create a user.
    ///
    /// Returns `None` when every required field is present.
    pub fn missing_fields(&self) -> Option<String> {
        let mut reasons = Vec::new();
        if self.username.is_empty() {
            reasons.push("empty username");
        }
        if self.password.is_empty() {
            reasons.push("empty password");
        }
        if self.email.is_empty() {
            reasons.push("empty email");
        }

        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join(", "))
        }
    }
}

/// Body of `PATCH /v1/user/{id}`
///
/// Every field is optional; absent or empty values keep the stored ones.
/// There is no `admin` or `id` field; unknown keys are dropped during decoding.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Generate a fresh salt when the password changes
    #[serde(default)]
    pub rotate_salt: bool,
}

/// Public view of a stored user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub admin: bool,
}
