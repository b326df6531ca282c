//! The vault record: master-password verifier, vault-key verifier, and
//! session-token material.

use chrono::{DateTime, Utc};
use rand::RngCore;
use tracing::debug;

use crate::crypto::hash::{constant_time_eq, sha256_hex};
use crate::crypto::kdf::KdfParams;
use crate::crypto::keys::{derive_vault_key_with_params, VaultKey};
use crate::crypto::password::generate_strong_password;
use crate::errors::{Result, VaultSafeError};
use crate::session::SessionSigner;

/// Length of the per-vault master-password salt.
pub const PASSWORD_SALT_LEN: usize = 25;

/// Length of the session salt.
const SESSION_SALT_LEN: usize = 15;

/// Random bytes behind the session secret key (hex-encoded when stored).
const SESSION_SECRET_BYTES: usize = 32;

/// Default session lifetime: three hours.
pub const DEFAULT_SESSION_EXPIRATION: u64 = 3 * 3600;

/// Optional metadata supplied at `init` time.
#[derive(Debug, Clone, Default)]
pub struct VaultProfile {
    pub name: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
}

/// Changes accepted by `update-vault`. `None` leaves a value untouched.
#[derive(Debug, Clone, Default)]
pub struct VaultUpdate {
    pub name: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub session_check: Option<bool>,
    pub session_expiration: Option<u64>,
}

/// The single vault row.
#[derive(Clone)]
pub struct VaultRecord {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    pub owner_name: String,
    pub owner_email: Option<String>,

    /// `sha256_hex(master_password + password_salt)`.
    pub master_password_hash: String,
    pub password_salt: String,

    /// Fingerprint of the vault key; diagnostic only.
    pub vault_key_hash: String,

    /// PBKDF2 iterations the vault key was derived with.
    pub kdf_iterations: u32,

    pub session_secret_key: String,
    pub session_salt: String,
    pub session_check: bool,
    /// Session token lifetime in seconds.
    pub session_expiration: u64,

    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl VaultRecord {
    /// Build a fresh vault for `master_password`.
    ///
    /// Returns the record together with the derived vault key so the
    /// caller does not pay for a second derivation. `id` is left at 0
    /// until the row is inserted.
    pub fn create(
        master_password: &str,
        profile: &VaultProfile,
        params: &KdfParams,
    ) -> Result<(Self, VaultKey)> {
        params.validate()?;

        let mut secret = [0u8; SESSION_SECRET_BYTES];
        rand::rng().fill_bytes(&mut secret);

        let now = Utc::now();
        let mut record = Self {
            id: 0,
            uuid: uuid::Uuid::new_v4().simple().to_string(),
            name: profile.name.clone().unwrap_or_else(default_vault_name),
            owner_name: profile.owner_name.clone().unwrap_or_else(default_owner_name),
            owner_email: profile.owner_email.clone(),
            master_password_hash: String::new(),
            password_salt: String::new(),
            vault_key_hash: String::new(),
            kdf_iterations: params.iterations,
            session_secret_key: hex::encode(secret),
            session_salt: generate_strong_password(SESSION_SALT_LEN)?,
            session_check: true,
            session_expiration: DEFAULT_SESSION_EXPIRATION,
            date_created: now,
            last_updated: now,
        };

        let vault_key = derive_vault_key_with_params(master_password, params)?;
        record.set_master_password_hash(master_password)?;
        record.set_vault_key_hash(&vault_key);
        Ok((record, vault_key))
    }

    /// Generate a fresh salt and store the salted master-password hash.
    pub fn set_master_password_hash(&mut self, master_password: &str) -> Result<()> {
        self.password_salt = generate_strong_password(PASSWORD_SALT_LEN)?;
        self.master_password_hash = sha256_hex(format!("{master_password}{}", self.password_salt));
        Ok(())
    }

    /// Store the vault-key fingerprint.
    pub fn set_vault_key_hash(&mut self, vault_key: &VaultKey) {
        self.vault_key_hash = vault_key.fingerprint();
    }

    /// Check a candidate master password against the stored hash.
    pub fn check_password(&self, candidate: &str) -> bool {
        let candidate_hash = sha256_hex(format!("{candidate}{}", self.password_salt));
        let ok = constant_time_eq(&candidate_hash, &self.master_password_hash);
        debug!(ok, "master password checked");
        ok
    }

    /// KDF parameters recorded for this vault.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            iterations: self.kdf_iterations,
        }
    }

    /// Derive the vault key with this vault's parameters.
    ///
    /// Does not verify the password; pair with `check_password`.
    pub fn derive_vault_key(&self, candidate: &str) -> Result<VaultKey> {
        derive_vault_key_with_params(candidate, &self.kdf_params())
    }

    /// Signer for this vault's session tokens.
    pub fn session_signer(&self) -> SessionSigner {
        SessionSigner::new(&self.session_secret_key, &self.session_salt)
    }

    /// Apply metadata edits. Session expiration must be positive.
    pub fn apply_update(&mut self, update: &VaultUpdate) -> Result<()> {
        if let Some(secs) = update.session_expiration {
            if secs == 0 {
                return Err(VaultSafeError::ConfigError(
                    "session expiration must be at least 1 second".into(),
                ));
            }
            self.session_expiration = secs;
        }
        if let Some(ref name) = update.name {
            self.name = name.clone();
        }
        if let Some(ref owner) = update.owner_name {
            self.owner_name = owner.clone();
        }
        if let Some(ref email) = update.owner_email {
            self.owner_email = Some(email.clone());
        }
        if let Some(check) = update.session_check {
            self.session_check = check;
        }
        self.last_updated = Utc::now();
        Ok(())
    }
}

impl std::fmt::Debug for VaultRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRecord")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .field("owner_name", &self.owner_name)
            .field("owner_email", &self.owner_email)
            .field("master_password_hash", &self.master_password_hash)
            .field("vault_key_hash", &self.vault_key_hash)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("session_secret_key", &"[REDACTED]")
            .field("session_check", &self.session_check)
            .field("session_expiration", &self.session_expiration)
            .finish_non_exhaustive()
    }
}

fn default_vault_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "VaultSafe".to_string())
}

fn default_owner_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "owner".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::PASSWORD_ALPHABET;

    fn fast() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    #[test]
    fn create_fills_verifiers_and_session_material() {
        let (record, key) = VaultRecord::create("Sys$ecure1", &VaultProfile::default(), &fast())
            .unwrap();
        assert_eq!(record.password_salt.len(), PASSWORD_SALT_LEN);
        assert!(record
            .password_salt
            .bytes()
            .all(|b| PASSWORD_ALPHABET.contains(&b)));
        assert_eq!(record.master_password_hash.len(), 64);
        assert_eq!(record.vault_key_hash, key.fingerprint());
        assert_eq!(record.session_secret_key.len(), 64);
        assert!(record.session_check);
        assert_eq!(record.session_expiration, DEFAULT_SESSION_EXPIRATION);
        assert_eq!(record.uuid.len(), 32);
    }

    #[test]
    fn check_password_accepts_only_the_right_one() {
        let (record, _) = VaultRecord::create("right-pw", &VaultProfile::default(), &fast())
            .unwrap();
        assert!(record.check_password("right-pw"));
        assert!(!record.check_password("wrong-pw"));
        assert!(!record.check_password(""));
    }

    #[test]
    fn rehash_rotates_salt() {
        let (mut record, _) = VaultRecord::create("pw-one", &VaultProfile::default(), &fast())
            .unwrap();
        let old_salt = record.password_salt.clone();
        let old_hash = record.master_password_hash.clone();
        record.set_master_password_hash("pw-one").unwrap();
        assert_ne!(record.password_salt, old_salt);
        assert_ne!(record.master_password_hash, old_hash);
        assert!(record.check_password("pw-one"));
    }

    #[test]
    fn profile_values_are_used() {
        let profile = VaultProfile {
            name: Some("Home".into()),
            owner_name: Some("Alice".into()),
            owner_email: Some("alice@example.com".into()),
        };
        let (record, _) = VaultRecord::create("pw", &profile, &fast()).unwrap();
        assert_eq!(record.name, "Home");
        assert_eq!(record.owner_name, "Alice");
        assert_eq!(record.owner_email.as_deref(), Some("alice@example.com"));
    }

    #[test]
    fn create_rejects_weak_kdf() {
        let result = VaultRecord::create(
            "pw",
            &VaultProfile::default(),
            &KdfParams { iterations: 1 },
        );
        assert!(result.is_err());
    }

    #[test]
    fn apply_update_rejects_zero_expiration() {
        let (mut record, _) = VaultRecord::create("pw", &VaultProfile::default(), &fast()).unwrap();
        let update = VaultUpdate {
            session_expiration: Some(0),
            ..VaultUpdate::default()
        };
        assert!(record.apply_update(&update).is_err());

        let update = VaultUpdate {
            session_check: Some(false),
            session_expiration: Some(60),
            ..VaultUpdate::default()
        };
        record.apply_update(&update).unwrap();
        assert!(!record.session_check);
        assert_eq!(record.session_expiration, 60);
    }

    #[test]
    fn debug_redacts_session_secret() {
        let (record, _) = VaultRecord::create("pw", &VaultProfile::default(), &fast()).unwrap();
        let printed = format!("{record:?}");
        assert!(!printed.contains(&record.session_secret_key));
    }
}
