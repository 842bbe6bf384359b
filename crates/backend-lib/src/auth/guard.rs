// ============================
// crates/backend-lib/src/auth/guard.rs
// ============================
//! Per-request authentication and role checks.
//!
//! Nothing is cached between calls: every request proves its credentials
//! again and every privileged operation re-reads the caller's admin flag.
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics::{AUTH_FAILURE, AUTH_FORBIDDEN, AUTH_SUCCESS};
use crate::model::{User, UserId};
use crate::storage::{Repository, StoreError};

/// Salt used for the throwaway derivation when the username is unknown
const DUMMY_SALT: [u8; 16] = [0u8; 16];

/// Privilege required by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Any authenticated caller
    User,
    /// Callers whose stored admin flag is set
    Admin,
}

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::User => true,
            Role::Admin => self.is_admin,
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Access decisions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Unknown user or wrong password; the two are never told apart
    #[error("access denied")]
    Unauthenticated,

    #[error("insufficient privilege")]
    Forbidden,

    /// The caller could not be resolved while checking privilege
    #[error("failed to resolve caller: {0}")]
    Lookup(StoreError),
}

/// Authentication and authorization over a [`Repository`]
#[derive(Clone)]
pub struct AccessGuard {
    repo: Arc<dyn Repository>,
}

impl std::fmt::Debug for AccessGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").finish_non_exhaustive()
    }
}

impl AccessGuard {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Check `password` against the stored credential of `username`
    pub fn authenticate(
        &self,
        username: &str,
        password: &[u8],
    ) -> Result<Principal, AccessError> {
        let user = match self.repo.get_user_by_name(username) {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // Spend the same Argon2 work an existing user would cost.
                let _ = self.repo.derive_credential(password, Some(DUMMY_SALT.as_slice()));
                return Err(self.reject(username));
            },
            Err(e) => return Err(AccessError::Lookup(e)),
        };

        let attempt = self
            .repo
            .derive_credential(password, Some(user.credential.salt()))
            .map_err(|e| AccessError::Lookup(e.into()))?;

        if !attempt.matches(&user.credential) {
            return Err(self.reject(username));
        }

        counter!(AUTH_SUCCESS).increment(1);
        debug!(user_id = %user.id, "caller authenticated");
        Ok(Principal::from(&user))
    }

    /// Require `role` from the user named `username`.
    ///
    /// The admin flag is read from the store, not from any earlier
    /// [`Principal`].
    pub fn authorize(&self, username: &str, role: Role) -> Result<(), AccessError> {
        let user = self
            .repo
            .get_user_by_name(username)
            .map_err(AccessError::Lookup)?;

        if Principal::from(&user).has_role(role) {
            Ok(())
        } else {
            counter!(AUTH_FORBIDDEN).increment(1);
            warn!(user_id = %user.id, ?role, "privileged operation refused");
            Err(AccessError::Forbidden)
        }
    }

    /// Authenticate, then authorize for `role`
    pub fn check(
        &self,
        username: &str,
        password: &[u8],
        role: Role,
    ) -> Result<Principal, AccessError> {
        let principal = self.authenticate(username, password)?;
        if role != Role::User {
            self.authorize(&principal.username, role)?;
        }
        Ok(principal)
    }

    /// True when the credentials belong to a known user
    pub fn is_authorized(&self, username: &str, password: &[u8]) -> bool {
        self.authenticate(username, password).is_ok()
    }

    fn reject(&self, username: &str) -> AccessError {
        counter!(AUTH_FAILURE).increment(1);
        warn!(username = %username, "authentication failed");
        AccessError::Unauthenticated
    }
}
