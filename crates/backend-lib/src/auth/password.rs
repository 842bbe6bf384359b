// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password credential derivation.
//!
//! Every password in the directory is stored as an Argon2id digest paired
//! with the per-user salt it was derived under. The pair travels as one
//! [`Credential`] so the two halves can never drift apart.
use argon2::{Algorithm, Argon2, Params, Version};
use constant_time_eq::constant_time_eq;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::HasherSettings;

/// Length of the raw Argon2 output in bytes
pub const DIGEST_LEN: usize = 32;

/// Smallest salt Argon2 accepts
pub const MIN_SALT_LEN: usize = 8;

/// Failures while deriving a credential
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hasher parameters: {0}")]
    Params(String),

    #[error("salt must be at least {min} bytes, got {actual}")]
    SaltTooShort { min: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    Derivation(String),
}

/// A password digest bound to the salt it was derived under
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    digest: String,
    salt: Vec<u8>,
}

impl Credential {
    /// Lowercase hex rendering of the Argon2id output
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    /// Constant-time digest comparison
    pub fn matches(&self, other: &Credential) -> bool {
        constant_time_eq(self.digest.as_bytes(), other.digest.as_bytes())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("digest", &"<redacted>")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

/// Argon2id credential hasher with fixed cost parameters
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    salt_len: usize,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self.argon2.params();
        f.debug_struct("CredentialHasher")
            .field("memory_kib", &params.m_cost())
            .field("iterations", &params.t_cost())
            .field("parallelism", &params.p_cost())
            .field("salt_len", &self.salt_len)
            .finish()
    }
}

impl CredentialHasher {
    /// Build a hasher from configured cost parameters
    pub fn new(settings: &HasherSettings) -> Result<Self, HashError> {
        if settings.salt_len < MIN_SALT_LEN {
            return Err(HashError::SaltTooShort {
                min: MIN_SALT_LEN,
                actual: settings.salt_len,
            });
        }

        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            Some(DIGEST_LEN),
        )
        .map_err(|e| HashError::Params(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            salt_len: settings.salt_len,
        })
    }

    /// Generate a fresh random salt of the configured width
    pub fn generate_salt(&self) -> Vec<u8> {
        let mut salt = vec![0u8; self.salt_len];
        rand::rng().fill_bytes(&mut salt);
        salt
    }

    /// Derive a credential from `password`.
    ///
    /// With `salt == None` a fresh salt is generated; otherwise the given salt
    /// is reused, which makes the result deterministic.
    pub fn derive(&self, password: &[u8], salt: Option<&[u8]>) -> Result<Credential, HashError> {
        let salt = match salt {
            Some(salt) => salt.to_vec(),
            None => self.generate_salt(),
        };
        if salt.len() < MIN_SALT_LEN {
            return Err(HashError::SaltTooShort {
                min: MIN_SALT_LEN,
                actual: salt.len(),
            });
        }

        let mut out = Zeroizing::new([0u8; DIGEST_LEN]);
        self.argon2
            .hash_password_into(password, &salt, out.as_mut())
            .map_err(|e| HashError::Derivation(e.to_string()))?;

        Ok(Credential {
            digest: hex::encode(out.as_ref()),
            salt,
        })
    }

    /// Check `password` against a stored credential
    pub fn verify(&self, password: &[u8], credential: &Credential) -> bool {
        match self.derive(password, Some(credential.salt())) {
            Ok(attempt) => attempt.matches(credential),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&HasherSettings::minimal()).unwrap()
    }

    #[test]
    fn test_derive_generates_salt_when_absent() {
        let h = hasher();
        let cred = h.derive(b"p1", None).unwrap();

        assert_eq!(cred.salt().len(), HasherSettings::minimal().salt_len);
        assert_eq!(cred.digest().len(), DIGEST_LEN * 2);
        assert!(cred.digest().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(cred.digest(), "p1");
    }

    #[test]
    fn test_derive_is_deterministic_for_fixed_salt() {
        let h = hasher();
        let first = h.derive(b"secret", None).unwrap();
        let again = h.derive(b"secret", Some(first.salt())).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_fresh_salts_differ() {
        let h = hasher();
        let a = h.derive(b"secret", None).unwrap();
        let b = h.derive(b"secret", None).unwrap();
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_verify_rejects_single_bit_flip() {
        let h = hasher();
        let cred = h.derive(b"password", None).unwrap();
        assert!(h.verify(b"password", &cred));

        let mut flipped = b"password".to_vec();
        flipped[0] ^= 0x01;
        assert!(!h.verify(&flipped, &cred));
    }

    #[test]
    fn test_short_salt_is_rejected() {
        let h = hasher();
        let err = h.derive(b"pw", Some(&b"short"[..])).unwrap_err();
        assert_eq!(err, HashError::SaltTooShort { min: MIN_SALT_LEN, actual: 5 });

        let mut settings = HasherSettings::minimal();
        settings.salt_len = 4;
        assert!(matches!(
            CredentialHasher::new(&settings),
            Err(HashError::SaltTooShort { .. })
        ));
    }

    #[test]
    fn test_invalid_cost_parameters() {
        let mut settings = HasherSettings::minimal();
        settings.parallelism = 0;
        assert!(matches!(CredentialHasher::new(&settings), Err(HashError::Params(_))));
    }

    #[test]
    fn test_debug_does_not_leak_digest() {
        let h = hasher();
        let cred = h.derive(b"pw", None).unwrap();
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains(cred.digest()));
    }

    #[test]
    fn test_matches_compares_digest_only() {
        let h = hasher();
        let cred = h.derive(b"secret", None).unwrap();
        let same = h.derive(b"secret", Some(cred.salt())).unwrap();
        let other = h.derive(b"secreT", Some(cred.salt())).unwrap();

        assert!(cred.matches(&same));
        assert!(!cred.matches(&other));
        assert!(!other.matches(&cred));
    }
}
