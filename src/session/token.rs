//! Signed, timestamped session tokens.
//!
//! A token has three dot-separated parts, each unpadded url-safe base64:
//!
//! ```text
//! payload . timestamp . signature
//! ```
//!
//! - **payload**: JSON `{"master_passwd": "..."}`
//! - **timestamp**: issue time in Unix seconds, big-endian, leading zero
//!   bytes stripped
//! - **signature**: HMAC-SHA256 over `payload.timestamp`
//!
//! The HMAC key is `SHA-256(salt || "signer" || secret_key)`, so a token
//! only verifies against the vault that issued it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::fernet::unix_now;
use crate::errors::{Result, VaultSafeError};

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '.';

#[derive(Serialize, Deserialize)]
struct SessionPayload {
    master_passwd: String,
}

/// Issues and verifies session tokens for one vault.
pub struct SessionSigner {
    key: Zeroizing<Vec<u8>>,
}

impl SessionSigner {
    /// Build a signer from the vault's session secret key and salt.
    pub fn new(secret_key: &str, salt: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(b"signer");
        hasher.update(secret_key.as_bytes());
        Self {
            key: Zeroizing::new(hasher.finalize().to_vec()),
        }
    }

    /// Issue a token embedding `master_password`, stamped with the current
    /// time.
    pub fn issue(&self, master_password: &str) -> Result<String> {
        self.issue_at(master_password, unix_now())
    }

    /// Issue a token with an explicit issue time.
    pub fn issue_at(&self, master_password: &str, issued_at: u64) -> Result<String> {
        let payload = Zeroizing::new(
            serde_json::to_vec(&SessionPayload {
                master_passwd: master_password.to_string(),
            })
            .map_err(|e| VaultSafeError::SerializationError(format!("session payload: {e}")))?,
        );

        let mut token = URL_SAFE_NO_PAD.encode(payload.as_slice());
        token.push(SEPARATOR);
        token.push_str(&URL_SAFE_NO_PAD.encode(timestamp_bytes(issued_at)));

        let signature = self.sign(token.as_bytes())?;
        token.push(SEPARATOR);
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));
        Ok(token)
    }

    /// Return the embedded master password if the token is authentic and
    /// no older than `max_age_secs`.
    ///
    /// Every failure is soft: the caller falls back to prompting.
    pub fn verify(&self, token: &str, max_age_secs: u64) -> Option<Zeroizing<String>> {
        match self.check_at(token, max_age_secs, unix_now()) {
            Ok(password) => Some(password),
            Err(e) => {
                warn!("session token rejected: {e}");
                None
            }
        }
    }

    /// Validate a token against an explicit "now".
    ///
    /// Returns `SessionExpired` for a bad signature, a malformed token, an
    /// expired token, or an issue time in the future.
    pub fn check_at(&self, token: &str, max_age_secs: u64, now: u64) -> Result<Zeroizing<String>> {
        let token = token.trim();
        let (signed, signature) = token
            .rsplit_once(SEPARATOR)
            .ok_or(VaultSafeError::SessionExpired)?;
        let (payload_b64, timestamp_b64) = signed
            .split_once(SEPARATOR)
            .ok_or(VaultSafeError::SessionExpired)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| VaultSafeError::SessionExpired)?;
        let mut mac = self.mac()?;
        mac.update(signed.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VaultSafeError::SessionExpired)?;

        let timestamp = URL_SAFE_NO_PAD
            .decode(timestamp_b64)
            .map_err(|_| VaultSafeError::SessionExpired)?;
        let issued_at = timestamp_from_bytes(&timestamp).ok_or(VaultSafeError::SessionExpired)?;
        let age = now
            .checked_sub(issued_at)
            .ok_or(VaultSafeError::SessionExpired)?;
        if age > max_age_secs {
            debug!(age, max_age_secs, "session token expired");
            return Err(VaultSafeError::SessionExpired);
        }

        let payload = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(payload_b64)
                .map_err(|_| VaultSafeError::SessionExpired)?,
        );
        let parsed: SessionPayload =
            serde_json::from_slice(&payload).map_err(|_| VaultSafeError::SessionExpired)?;
        Ok(Zeroizing::new(parsed.master_passwd))
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| VaultSafeError::EncryptionFailed(format!("HMAC init: {e}")))
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSigner([redacted])")
    }
}

fn timestamp_bytes(ts: u64) -> Vec<u8> {
    let bytes = ts.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

fn timestamp_from_bytes(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}
