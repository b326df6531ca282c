use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{KdfParams, DEFAULT_ITERATIONS};
use crate::errors::{Result, VaultSafeError};
use crate::vault::record::DEFAULT_SESSION_EXPIRATION;
use crate::vault::store::DB_FILE_NAME;

/// Environment variable that overrides the data directory.
pub const HOME_ENV_VAR: &str = "VAULTSAFE_HOME";

/// Directory name under the user's home when nothing else is set.
const DEFAULT_DIR_NAME: &str = ".vaultsafe";

/// File holding the current session token.
const SESSION_FILE_NAME: &str = ".session";

/// Defaults applied when a vault is created, loaded from
/// `<data_dir>/vaultsafe.toml`.
///
/// Every field has a default so VaultSafe works without any config file.
/// Values written into the vault row at `init` (iterations, session
/// policy) are read from the vault afterwards, not from here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// PBKDF2 iterations for new vaults (default: 100 000).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Whether new vaults reuse a session instead of prompting every time.
    #[serde(default = "default_session_check")]
    pub session_check: bool,

    /// Session lifetime in seconds for new vaults (default: 3 hours).
    #[serde(default = "default_session_expiration")]
    pub session_expiration: u64,

    /// Length of passwords produced by `generate` and `add --generate`.
    #[serde(default = "default_generated_password_length")]
    pub generated_password_length: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_session_check() -> bool {
    true
}

fn default_session_expiration() -> u64 {
    DEFAULT_SESSION_EXPIRATION
}

fn default_generated_password_length() -> usize {
    18
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            session_check: default_session_check(),
            session_expiration: default_session_expiration(),
            generated_password_length: default_generated_password_length(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the data directory.
    const FILE_NAME: &'static str = "vaultsafe.toml";

    /// Load settings from `<data_dir>/vaultsafe.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultSafeError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.kdf_params().validate()?;
        if settings.session_expiration == 0 {
            return Err(VaultSafeError::ConfigError(
                "session_expiration must be at least 1 second".into(),
            ));
        }

        Ok(settings)
    }

    /// KDF parameters for a new vault.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.kdf_iterations,
        }
    }

    /// `<data_dir>/vaultsafe.db`
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(DB_FILE_NAME)
    }

    /// `<data_dir>/.session`
    pub fn session_path(data_dir: &Path) -> PathBuf {
        data_dir.join(SESSION_FILE_NAME)
    }
}

/// Resolve the data directory: explicit flag, then `VAULTSAFE_HOME`, then
/// `~/.vaultsafe`.
pub fn resolve_data_dir(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Ok(dir) = std::env::var(HOME_ENV_VAR) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .ok_or_else(|| {
            VaultSafeError::ConfigError(format!(
                "cannot locate a home directory; set {HOME_ENV_VAR} or pass --data-dir"
            ))
        })
}

// ── Tests ────────────────────────────────────────────────────────────
