// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core of the profile-saver user directory.
//!
//! The [`storage::UserStore`] owns every user record and its password
//! credential, [`auth::AccessGuard`] answers "who is calling" and "may they
//! do this", and [`router::create_router`] exposes both over HTTP.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod model;
pub mod router;
pub mod storage;

use std::sync::Arc;

use crate::auth::{AccessGuard, CredentialHasher};
use crate::config::Settings;
use crate::model::NewUser;
use crate::storage::{Repository, UserStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// User directory
    pub repo: Arc<dyn Repository>,
    /// Authentication service
    pub guard: AccessGuard,
    /// Settings the server was started with
    pub settings: Arc<Settings>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create a new application state over an existing repository
    pub fn new(repo: Arc<dyn Repository>, settings: Settings) -> Self {
        let guard = AccessGuard::new(repo.clone());
        Self {
            repo,
            guard,
            settings: Arc::new(settings),
        }
    }

    /// Build the store from settings, seeded with the configured admin
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(&settings.hasher)?;
        let admin = NewUser::new(
            settings.admin.username.clone(),
            settings.admin.email.clone(),
            settings.admin.password.clone(),
            true,
        );
        let store = UserStore::with_bootstrap(hasher, [admin])?;
        tracing::info!(admin = %settings.admin.username, "user store initialised");
        Ok(Self::new(Arc::new(store), settings))
    }
}
