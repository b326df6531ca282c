//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The derivation is deterministic: the vault key is never stored, so the
//! same password and parameters must always reproduce the same bytes.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultSafeError};

/// Application-wide salt for the vault key.
///
/// Per-vault uniqueness comes from the salted master-password hash, not
/// from this value.
pub const VAULT_KEY_SALT: &[u8] = b"salt-for-key-derivation-from-master-key";

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Lowest iteration count accepted for a stored vault.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Length of the derived key in bytes.
pub const KEY_LEN: usize = 32;

/// Tunable PBKDF2 parameters.
///
/// Stored on the vault record so a vault created with a non-default
/// count keeps deriving the same key after the config file changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    /// Reject dangerously weak parameters before they reach a vault.
    pub fn validate(&self) -> Result<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(VaultSafeError::KeyDerivationFailed(format!(
                "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {})",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// Derive `key_len` bytes from `password` and `salt`.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    key_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if iterations == 0 {
        return Err(VaultSafeError::KeyDerivationFailed(
            "PBKDF2 iterations must be at least 1".into(),
        ));
    }
    if key_len == 0 {
        return Err(VaultSafeError::KeyDerivationFailed(
            "derived key length must be at least 1 byte".into(),
        ));
    }

    let mut key = Zeroizing::new(vec![0u8; key_len]);
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    Ok(key)
}
