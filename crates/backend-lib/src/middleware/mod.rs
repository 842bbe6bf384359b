// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the profile-saver HTTP server.

pub mod basic_auth;

pub use basic_auth::{basic_auth, BasicCredentials};
