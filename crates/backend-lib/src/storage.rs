// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! In-memory user directory.
//!
//! Records live in an `id -> User` map with a `username -> id` index next to
//! it. Both maps sit behind a single `RwLock` so a reader can never see one
//! updated without the other. Argon2 work always happens before the write
//! lock is taken.
use std::collections::HashMap;

use metrics::counter;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::{Credential, CredentialHasher, HashError};
use crate::metrics::{USER_CONFLICT, USER_CREATED, USER_DELETED, USER_UPDATED};
use crate::model::{NewUser, User, UserId, UserPatch};

/// Failures reported by the user store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("username {0:?} is already taken")]
    UsernameTaken(String),

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Operations the HTTP boundary needs from a user directory
pub trait Repository: Send + Sync {
    /// Insert a new user under a freshly generated id
    fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Point-in-time snapshot of every user, in no particular order
    fn get_all_users(&self) -> Vec<User>;

    fn get_user_by_id(&self, id: &UserId) -> Result<User, StoreError>;

    fn get_user_by_name(&self, name: &str) -> Result<User, StoreError>;

    /// Apply a partial update to the user with the given id
    fn update_user(&self, id: &UserId, patch: UserPatch) -> Result<User, StoreError>;

    fn delete_user(&self, id: &UserId) -> Result<(), StoreError>;

    /// Hash `password` under `salt`, or under a fresh salt when absent
    fn derive_credential(&self, password: &[u8], salt: Option<&[u8]>)
        -> Result<Credential, HashError>;
}

/// Primary records plus the username index
#[derive(Debug, Default)]
struct Directory {
    by_id: HashMap<UserId, User>,
    by_name: HashMap<String, UserId>,
}

impl Directory {
    fn lookup_name(&self, name: &str) -> Option<&User> {
        let id = self.by_name.get(name)?;
        match self.by_id.get(id) {
            Some(user) => Some(user),
            None => panic!("username index entry {name:?} points at missing record {id}"),
        }
    }

    fn fresh_id(&self) -> UserId {
        loop {
            let id = Uuid::new_v4();
            if !self.by_id.contains_key(&id) {
                return id;
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        assert_eq!(self.by_id.len(), self.by_name.len());
        for (name, id) in &self.by_name {
            let user = self.by_id.get(id).expect("index points at missing record");
            assert_eq!(&user.username, name);
        }
    }
}

/// Thread-safe user directory
#[derive(Debug)]
pub struct UserStore {
    inner: RwLock<Directory>,
    hasher: CredentialHasher,
}

impl UserStore {
    /// An empty store
    pub fn new(hasher: CredentialHasher) -> Self {
        Self {
            inner: RwLock::new(Directory::default()),
            hasher,
        }
    }

    /// A store seeded with bootstrap accounts, created in order
    pub fn with_bootstrap(
        hasher: CredentialHasher,
        seed: impl IntoIterator<Item = NewUser>,
    ) -> Result<Self, StoreError> {
        let store = Self::new(hasher);
        for user in seed {
            store.create(user)?;
        }
        Ok(store)
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[instrument(skip_all, fields(username = %user.username))]
    pub fn create(&self, user: NewUser) -> Result<User, StoreError> {
        // Cheap early rejection; the authoritative check happens under the write lock.
        if self.inner.read().by_name.contains_key(&user.username) {
            return Err(self.conflict(&user.username));
        }

        let credential = self.hasher.derive(user.password.as_bytes(), None)?;

        let mut dir = self.inner.write();
        if dir.by_name.contains_key(&user.username) {
            return Err(self.conflict(&user.username));
        }

        let id = dir.fresh_id();
        let record = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            credential,
            is_admin: user.is_admin,
        };
        dir.by_name.insert(record.username.clone(), id);
        dir.by_id.insert(id, record.clone());
        drop(dir);

        counter!(USER_CREATED).increment(1);
        info!(user_id = %id, admin = record.is_admin, "user created");
        Ok(record)
    }

    pub fn get_all(&self) -> Vec<User> {
        self.inner.read().by_id.values().cloned().collect()
    }

    pub fn get_by_username(&self, name: &str) -> Result<User, StoreError> {
        self.inner
            .read()
            .lookup_name(name)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    pub fn get_by_id(&self, id: &UserId) -> Result<User, StoreError> {
        self.inner
            .read()
            .by_id
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    /// Apply `patch` to the user with `id`.
    ///
    /// Empty fields keep their stored value; the stored id and admin flag are
    /// never touched. A new password is derived under the user's existing
    /// salt unless `rotate_salt` is set.
    #[instrument(skip_all, fields(user_id = %id))]
    pub fn update(&self, id: &UserId, patch: UserPatch) -> Result<User, StoreError> {
        loop {
            let (credential, basis_salt) = self.derive_for_patch(id, &patch)?;

            let mut dir = self.inner.write();
            let current = dir.by_id.get(id).ok_or(StoreError::NotFound)?;

            // The salt moved while we were hashing; redo the derivation.
            if let Some(salt) = &basis_salt {
                if current.credential.salt() != salt.as_slice() {
                    debug!("salt rotated concurrently, re-deriving");
                    continue;
                }
            }

            let old_name = current.username.clone();
            let new_name = patch.username().unwrap_or(old_name.as_str()).to_string();
            if new_name != old_name {
                if let Some(owner) = dir.by_name.get(&new_name) {
                    if owner != id {
                        drop(dir);
                        return Err(self.conflict(&new_name));
                    }
                }
            }

            let mut updated = current.clone();
            updated.username = new_name;
            if let Some(email) = patch.email() {
                updated.email = email.to_string();
            }
            if let Some(credential) = credential {
                updated.credential = credential;
            }

            if updated.username != old_name {
                dir.by_name.remove(&old_name);
                dir.by_name.insert(updated.username.clone(), *id);
                debug!(from = %old_name, to = %updated.username, "username changed");
            }
            dir.by_id.insert(*id, updated.clone());
            drop(dir);

            counter!(USER_UPDATED).increment(1);
            info!("user updated");
            return Ok(updated);
        }
    }

    #[instrument(skip_all, fields(user_id = %id))]
    pub fn delete(&self, id: &UserId) -> Result<(), StoreError> {
        let mut dir = self.inner.write();
        let removed = dir.by_id.remove(id).ok_or(StoreError::NotFound)?;
        let indexed = dir.by_name.remove(&removed.username);
        assert_eq!(
            indexed.as_ref(),
            Some(id),
            "username index out of sync for {:?}",
            removed.username
        );
        drop(dir);

        counter!(USER_DELETED).increment(1);
        info!(username = %removed.username, "user deleted");
        Ok(())
    }

    /// Derive the credential a patch asks for, outside the lock.
    ///
    /// Returns the new credential (if any) and the stored salt it was derived
    /// under, so the caller can detect a concurrent rotation.
    fn derive_for_patch(
        &self,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<(Option<Credential>, Option<Vec<u8>>), StoreError> {
        let Some(password) = patch.password() else {
            return Ok((None, None));
        };

        if patch.rotate_salt {
            let credential = self.hasher.derive(password.as_bytes(), None)?;
            return Ok((Some(credential), None));
        }

        let salt = self.get_by_id(id)?.credential.salt().to_vec();
        let credential = self.hasher.derive(password.as_bytes(), Some(&salt))?;
        Ok((Some(credential), Some(salt)))
    }

    fn conflict(&self, name: &str) -> StoreError {
        counter!(USER_CONFLICT).increment(1);
        debug!(username = %name, "username already taken");
        StoreError::UsernameTaken(name.to_string())
    }
}

impl Repository for UserStore {
    fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.create(user)
    }

    fn get_all_users(&self) -> Vec<User> {
        self.get_all()
    }

    fn get_user_by_id(&self, id: &UserId) -> Result<User, StoreError> {
        self.get_by_id(id)
    }

    fn get_user_by_name(&self, name: &str) -> Result<User, StoreError> {
        self.get_by_username(name)
    }

    fn update_user(&self, id: &UserId, patch: UserPatch) -> Result<User, StoreError> {
        self.update(id, patch)
    }

    fn delete_user(&self, id: &UserId) -> Result<(), StoreError> {
        self.delete(id)
    }

    fn derive_credential(
        &self,
        password: &[u8],
        salt: Option<&[u8]>,
    ) -> Result<Credential, HashError> {
        self.hasher.derive(password, salt)
    }
}
