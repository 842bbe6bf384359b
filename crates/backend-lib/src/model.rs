// ============================
// crates/backend-lib/src/model.rs
// ============================
//! User records and the inputs that create or change them.
use profile_saver_common::{UserPatchRequest, UserRequest, UserResponse};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::auth::Credential;

/// Store-assigned user identifier
pub type UserId = Uuid;

/// A stored user.
///
/// Only [`UserStore`](crate::storage::UserStore) produces these; callers
/// describe new users with [`NewUser`] and changes with [`UserPatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub credential: Credential,
    pub is_admin: bool,
}

/// Input for creating a user; `password` is plaintext and wiped once hashed
#[derive(Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_admin: bool,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        is_admin: bool,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            is_admin,
        }
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .finish_non_exhaustive()
    }
}

impl Drop for NewUser {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Partial update of a stored user.
///
/// `None` and empty strings both mean "keep the stored value". Identity and
/// privilege are not representable here.
#[derive(Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Derive the new password under a fresh salt instead of the stored one
    pub rotate_salt: bool,
}

impl UserPatch {
    pub(crate) fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }

    pub(crate) fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|s| !s.is_empty())
    }

    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|s| !s.is_empty())
    }
}

impl std::fmt::Debug for UserPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPatch")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &self.password().map(|_| "<redacted>"))
            .field("rotate_salt", &self.rotate_salt)
            .finish()
    }
}

impl Drop for UserPatch {
    fn drop(&mut self) {
        if let Some(password) = self.password.as_mut() {
            password.zeroize();
        }
    }
}

impl From<UserRequest> for NewUser {
    fn from(req: UserRequest) -> Self {
        Self::new(req.username, req.email, req.password, req.admin)
    }
}

impl From<UserPatchRequest> for UserPatch {
    fn from(req: UserPatchRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: req.password,
            rotate_salt: req.rotate_salt,
        }
    }
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            admin: user.is_admin,
        }
    }
}
