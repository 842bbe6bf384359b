// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod guard;
pub mod password;

pub use guard::{AccessError, AccessGuard, Principal, Role};
pub use password::{Credential, CredentialHasher, HashError, DIGEST_LEN, MIN_SALT_LEN};
