//! Fernet authenticated encryption (AES-128-CBC + HMAC-SHA256).
//!
//! Every call to `encrypt` draws a fresh random IV, so the same plaintext
//! under the same key never produces the same token twice.
//!
//! Layout of a token before url-safe base64 encoding:
//!
//! ```text
//! [ 0x80 | timestamp: u64 BE | IV: 16 bytes | AES-128-CBC ciphertext | HMAC-SHA256: 32 bytes ]
//! ```
//!
//! The HMAC covers everything before it and is checked before any
//! decryption is attempted.

use aes::Aes128;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultSafeError};

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Token format version byte.
const VERSION: u8 = 0x80;

/// Size of the raw key: 16 signing bytes followed by 16 encryption bytes.
pub const FERNET_KEY_LEN: usize = 32;

const IV_LEN: usize = 16;
const HMAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// version + timestamp + IV.
const HEADER_LEN: usize = 1 + 8 + IV_LEN;

/// A 32-byte Fernet key, zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct FernetKey {
    bytes: [u8; FERNET_KEY_LEN],
}

impl FernetKey {
    /// Generate a fresh random key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; FERNET_KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Build a key from exactly 32 raw bytes.
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let bytes: [u8; FERNET_KEY_LEN] = raw.try_into().map_err(|_| {
            VaultSafeError::EncryptionFailed(format!(
                "Fernet key must be {FERNET_KEY_LEN} bytes, got {}",
                raw.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse the url-safe base64 form (44 characters).
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut raw = URL_SAFE
            .decode(encoded.trim())
            .map_err(|_| VaultSafeError::DecryptionFailed)?;
        let key = Self::from_slice(&raw).map_err(|_| VaultSafeError::DecryptionFailed);
        raw.zeroize();
        key
    }

    /// Url-safe base64 form, wiped from memory on drop.
    pub fn to_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(self.bytes))
    }

    fn signing_key(&self) -> &[u8] {
        &self.bytes[..16]
    }

    fn encryption_key(&self) -> &[u8] {
        &self.bytes[16..]
    }
}

impl std::fmt::Debug for FernetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FernetKey([redacted])")
    }
}

/// Generate a fresh random key.
pub fn generate_key() -> FernetKey {
    FernetKey::generate()
}

/// Encrypt `plaintext` and return the url-safe base64 token.
pub fn encrypt(key: &FernetKey, plaintext: &[u8]) -> Result<String> {
    let mut iv = [0u8; IV_LEN];
    rand::rng().fill_bytes(&mut iv);
    encrypt_with(key, plaintext, unix_now(), &iv)
}

/// Encrypt with an explicit timestamp and IV.
///
/// Only `encrypt` should call this outside of tests; reusing an IV under
/// the same key breaks confidentiality.
pub(crate) fn encrypt_with(
    key: &FernetKey,
    plaintext: &[u8],
    timestamp: u64,
    iv: &[u8; IV_LEN],
) -> Result<String> {
    let ciphertext = Aes128CbcEnc::new_from_slices(key.encryption_key(), iv)
        .map_err(|e| VaultSafeError::EncryptionFailed(format!("AES init: {e}")))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut token = Vec::with_capacity(HEADER_LEN + ciphertext.len() + HMAC_LEN);
    token.push(VERSION);
    token.extend_from_slice(&timestamp.to_be_bytes());
    token.extend_from_slice(iv);
    token.extend_from_slice(&ciphertext);

    let mut mac = HmacSha256::new_from_slice(key.signing_key())
        .map_err(|e| VaultSafeError::EncryptionFailed(format!("HMAC init: {e}")))?;
    mac.update(&token);
    token.extend_from_slice(&mac.finalize().into_bytes());

    Ok(URL_SAFE.encode(token))
}

/// Verify and decrypt a token produced by `encrypt`.
///
/// Any malformed input, HMAC mismatch, or padding error yields
/// `DecryptionFailed`; no partial plaintext is ever returned.
pub fn decrypt(key: &FernetKey, token: &str) -> Result<Vec<u8>> {
    let data = URL_SAFE
        .decode(token.trim())
        .map_err(|_| VaultSafeError::DecryptionFailed)?;

    // Header, at least one cipher block, and the tag.
    if data.len() < HEADER_LEN + BLOCK_LEN + HMAC_LEN || data[0] != VERSION {
        return Err(VaultSafeError::DecryptionFailed);
    }

    let (signed, tag) = data.split_at(data.len() - HMAC_LEN);
    let mut mac = HmacSha256::new_from_slice(key.signing_key())
        .map_err(|_| VaultSafeError::DecryptionFailed)?;
    mac.update(signed);
    mac.verify_slice(tag)
        .map_err(|_| VaultSafeError::DecryptionFailed)?;

    let iv = &signed[9..HEADER_LEN];
    let ciphertext = &signed[HEADER_LEN..];
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(VaultSafeError::DecryptionFailed);
    }

    Aes128CbcDec::new_from_slices(key.encryption_key(), iv)
        .map_err(|_| VaultSafeError::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| VaultSafeError::DecryptionFailed)
}

/// Current Unix time in seconds, shared by token timestamps.
pub(crate) fn unix_now() -> u64 {
    // Clamp pre-epoch clocks to zero rather than failing.
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
