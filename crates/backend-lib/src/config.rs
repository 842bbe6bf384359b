// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::auth::password::MIN_SALT_LEN;

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for environment overrides, e.g. `PROFILE_SAVER_ADMIN__PASSWORD`
pub const ENV_PREFIX: &str = "PROFILE_SAVER_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout_secs: u64,
    /// Seed administrator inserted at startup
    pub admin: AdminSettings,
    /// Argon2 cost parameters
    pub hasher: HasherSettings,
}

/// The bootstrap administrator account
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdminSettings {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSettings")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HasherSettings {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Width of generated salts in bytes
    pub salt_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            shutdown_timeout_secs: 5,
            admin: AdminSettings::default(),
            hasher: HasherSettings::default(),
        }
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            email: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

impl Default for HasherSettings {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 1,
            parallelism: 4,
            salt_len: 16,
        }
    }
}

impl HasherSettings {
    /// Cheapest parameter set Argon2 accepts. Tests and local tinkering only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
            salt_len: 16,
        }
    }
}

impl Settings {
    /// Layered sources: defaults, then the TOML file, then environment.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings from `config.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from an explicit config file and the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level {:?}", self.log_level);
        }
        if self.admin.username.is_empty() {
            bail!("admin username must not be empty");
        }
        if self.admin.password.is_empty() {
            bail!("admin password must not be empty");
        }
        if self.hasher.salt_len < MIN_SALT_LEN {
            bail!(
                "hasher salt_len must be at least {MIN_SALT_LEN}, got {}",
                self.hasher.salt_len
            );
        }
        if self.hasher.iterations == 0 || self.hasher.parallelism == 0 {
            bail!("hasher iterations and parallelism must be positive");
        }
        match self.hasher.parallelism.checked_mul(8) {
            Some(floor) if self.hasher.memory_kib >= floor => {},
            Some(floor) => bail!("hasher memory_kib must be at least 8 x parallelism ({floor})"),
            None => bail!("hasher parallelism {} is out of range", self.hasher.parallelism),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_parameters() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.hasher.memory_kib, 64 * 1024);
        assert_eq!(settings.hasher.iterations, 1);
        assert_eq!(settings.hasher.parallelism, 4);
        assert_eq!(settings.admin.username, "admin");
    }

    #[test]
    fn test_settings_validation() {
        let settings = Settings::default();

        let mut invalid = settings.clone();
        invalid.log_level = "loud".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.admin.password.clear();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.admin.username.clear();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hasher.salt_len = 4;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hasher.memory_kib = 16;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hasher.parallelism = u32::MAX;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hasher.memory_kib = u32::MAX;
        invalid.hasher.parallelism = u32::MAX / 8 + 1;
        assert!(invalid.validate().is_err());

        let mut uppercase = settings;
        uppercase.log_level = "DEBUG".to_string();
        assert!(uppercase.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "0.0.0.0:9000"
log_level = "debug"

[admin]
username = "root"
password = "hunter2"

[hasher]
memory_kib = 128
parallelism = 2
"#
        )
        .unwrap();

        let settings: Settings = Settings::figment(Some(file.path())).extract().unwrap();
        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.admin.username, "root");
        assert_eq!(settings.admin.email, "admin");
        assert_eq!(settings.hasher.memory_kib, 128);
        assert_eq!(settings.hasher.salt_len, 16);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
log_level = "warn"
[admin]
password = "from-file"
"#,
            )?;
            jail.set_env("PROFILE_SAVER_ADMIN__PASSWORD", "from-env");
            jail.set_env("PROFILE_SAVER_BIND_ADDR", "127.0.0.1:3001");

            let settings = Settings::load_from(Some(Path::new("custom.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(settings.log_level, "warn");
            assert_eq!(settings.admin.password, "from-env");
            assert_eq!(settings.bind_addr.port(), 3001);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load().map_err(|e| e.to_string())?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_admin_debug_redacts_password() {
        let rendered = format!("{:?}", AdminSettings::default());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("password: \"admin\""));
    }
}
