use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in VaultSafe.
#[derive(Debug, Error)]
pub enum VaultSafeError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or tampered data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault errors ---
    #[error("Vault not initialized, run `vaultsafe init` first")]
    VaultNotInitialized,

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    #[error("Wrong master password")]
    AuthenticationFailed,

    #[error("Credential '{0}' not found")]
    CredentialNotFound(String),

    #[error("Mnemonic '{0}' is already in use")]
    DuplicateMnemonic(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Master password rotation failed, nothing was changed: {0}")]
    RotationFailed(String),

    // --- Session errors ---
    #[error("Session token expired or invalid")]
    SessionExpired,

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Convenience type alias for VaultSafe results.
pub type Result<T> = std::result::Result<T, VaultSafeError>;
