//! Cryptographic primitives for VaultSafe.
//!
//! This module provides:
//! - SHA-256 digests and constant-time comparison (`hash`)
//! - PBKDF2-HMAC-SHA256 key derivation (`kdf`)
//! - Fernet authenticated encryption (`fernet`)
//! - The vault-key / credential-key hierarchy (`keys`)
//! - Random password and salt generation (`password`)

pub mod fernet;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod password;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_vault_key, ...};
pub use fernet::{decrypt, encrypt, generate_key, FernetKey};
pub use hash::{constant_time_eq, sha256_hex};
pub use kdf::{derive_key, KdfParams};
pub use keys::{
    derive_vault_key, derive_vault_key_with_params, unwrap_credential_key, wrap_credential_key,
    CredentialKey, VaultKey,
};
pub use password::generate_strong_password;
