//! Two-level key hierarchy.
//!
//! - The **vault key** is derived from the master password and is never
//!   stored.
//! - Each credential gets its own random **credential key**, stored only in
//!   wrapped form (encrypted under the vault key).
//!
//! Changing the master password therefore re-wraps one small key per
//! credential instead of re-encrypting every field.

use tracing::debug;
use zeroize::Zeroizing;

use super::fernet::{self, FernetKey};
use super::hash::sha256_hex;
use super::kdf::{self, KdfParams, KEY_LEN, VAULT_KEY_SALT};
use crate::errors::{Result, VaultSafeError};

/// Key derived from the master password. Wraps every credential key.
#[derive(Clone)]
pub struct VaultKey(FernetKey);

/// Random per-credential key. Encrypts that credential's fields.
#[derive(Clone)]
pub struct CredentialKey(FernetKey);

impl VaultKey {
    pub fn as_fernet(&self) -> &FernetKey {
        &self.0
    }

    /// SHA-256 of the key's base64 form, stored on the vault record for
    /// diagnostics. Never used to recover the key.
    pub fn fingerprint(&self) -> String {
        sha256_hex(self.0.to_base64().as_bytes())
    }
}

impl CredentialKey {
    /// Generate a fresh random credential key.
    pub fn generate() -> Self {
        Self(fernet::generate_key())
    }

    pub fn as_fernet(&self) -> &FernetKey {
        &self.0
    }

    /// Encrypt a field value under this key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        fernet::encrypt(&self.0, plaintext.as_bytes())
    }

    /// Decrypt a field value, wiping the bytes if they are not UTF-8.
    pub fn decrypt(&self, token: &str) -> Result<Zeroizing<String>> {
        let bytes = fernet::decrypt(&self.0, token)?;
        String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
            let _wiped = Zeroizing::new(e.into_bytes());
            VaultSafeError::SerializationError("field value is not valid UTF-8".to_string())
        })
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("VaultKey([redacted])")
    }
}

impl std::fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialKey([redacted])")
    }
}

/// Derive the vault key with the default iteration count.
///
/// Deliberately slow: derive once per command and reuse the result.
pub fn derive_vault_key(master_password: &str) -> Result<VaultKey> {
    derive_vault_key_with_params(master_password, &KdfParams::default())
}

/// Derive the vault key with explicit parameters.
pub fn derive_vault_key_with_params(master_password: &str, params: &KdfParams) -> Result<VaultKey> {
    debug!(iterations = params.iterations, "deriving vault key");
    let raw = kdf::derive_key(
        master_password.as_bytes(),
        VAULT_KEY_SALT,
        params.iterations,
        KEY_LEN,
    )?;
    Ok(VaultKey(FernetKey::from_slice(&raw)?))
}

/// Encrypt a credential key under the vault key.
///
/// The base64 form of the key is what gets encrypted, so wrapped keys stay
/// readable by any Fernet implementation.
pub fn wrap_credential_key(credential_key: &CredentialKey, vault_key: &VaultKey) -> Result<String> {
    let encoded = credential_key.0.to_base64();
    fernet::encrypt(&vault_key.0, encoded.as_bytes())
}

/// Decrypt a wrapped credential key.
///
/// A wrong vault key (wrong master password) surfaces as
/// `DecryptionFailed`.
pub fn unwrap_credential_key(wrapped: &str, vault_key: &VaultKey) -> Result<CredentialKey> {
    let encoded = Zeroizing::new(fernet::decrypt(&vault_key.0, wrapped)?);
    let text = std::str::from_utf8(&encoded).map_err(|_| VaultSafeError::DecryptionFailed)?;
    Ok(CredentialKey(FernetKey::from_base64(text)?))
}
