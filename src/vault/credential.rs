//! Credential record: ciphertext fields plus the credential's own wrapped
//! key.
//!
//! Every present field is encrypted under the credential key; the
//! credential key is encrypted under the vault key. Absent fields stay
//! `FieldState::Absent` and are never encrypted as empty strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fields::{
    CredentialField, CredentialFields, EncryptedFields, FieldState, FieldValue, Fields,
    RevealedFields,
};
use crate::crypto::keys::{unwrap_credential_key, wrap_credential_key, CredentialKey, VaultKey};
use crate::errors::Result;

/// Algorithm tag written for every new credential.
pub const DEFAULT_ENCRYPTION_ALGORITHM: &str = "Fernet";

/// A stored credential. Secret fields are ciphertext only.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Row id (0 until inserted).
    pub id: i64,

    /// Opaque identifier (32 hex chars), usable instead of a mnemonic.
    pub uuid: String,

    /// Plaintext label, e.g. "GitHub".
    pub name: String,

    /// Per-field ciphertext under the credential key.
    pub fields: EncryptedFields,

    /// The credential key, wrapped under the vault key.
    pub encrypted_key: String,

    /// Cipher that produced `fields` and `encrypted_key`.
    pub encryption_algorithm: String,

    /// Aliases that resolve to this credential.
    pub mnemonics: Vec<String>,

    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Decrypted view of a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaintextCredential {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    #[serde(flatten)]
    pub fields: RevealedFields,
    pub mnemonics: Vec<String>,
    pub encryption_algorithm: String,
    pub date_created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl PlaintextCredential {
    pub fn field(&self, field: CredentialField) -> &FieldValue {
        self.fields.get(field)
    }
}

impl Credential {
    /// Encrypt `fields` under a fresh credential key and wrap that key
    /// under `vault_key`.
    pub fn create_encrypted(
        name: &str,
        fields: &CredentialFields,
        vault_key: &VaultKey,
    ) -> Result<Self> {
        let credential_key = CredentialKey::generate();

        let encrypted = Fields::try_from_fn(|field| match fields.get(field) {
            Some(value) => credential_key.encrypt(value).map(FieldState::Present),
            None => Ok(FieldState::Absent),
        })?;
        let encrypted_key = wrap_credential_key(&credential_key, vault_key)?;

        let now = Utc::now();
        Ok(Self {
            id: 0,
            uuid: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            fields: encrypted,
            encrypted_key,
            encryption_algorithm: DEFAULT_ENCRYPTION_ALGORITHM.to_string(),
            mnemonics: Vec::new(),
            date_created: now,
            last_updated: now,
        })
    }

    /// Unwrap this credential's key.
    ///
    /// Fails with `DecryptionFailed` if `vault_key` is not the key the
    /// credential was last wrapped under.
    pub fn get_decrypted_key(&self, vault_key: &VaultKey) -> Result<CredentialKey> {
        unwrap_credential_key(&self.encrypted_key, vault_key)
    }

    /// Stored state of every field.
    pub fn encrypted_fields(&self) -> &EncryptedFields {
        &self.fields
    }

    /// Stored state of one field.
    pub fn field_state(&self, field: CredentialField) -> &FieldState {
        self.fields.get(field)
    }

    /// Decrypt every present field. The key is unwrapped once.
    pub fn to_plaintext(&self, vault_key: &VaultKey) -> Result<PlaintextCredential> {
        let credential_key = self.get_decrypted_key(vault_key)?;
        let revealed = Fields::try_from_fn(|field| reveal(&credential_key, self.fields.get(field)))?;

        Ok(PlaintextCredential {
            id: self.id,
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            fields: revealed,
            mnemonics: self.mnemonics.clone(),
            encryption_algorithm: self.encryption_algorithm.clone(),
            date_created: self.date_created,
            last_updated: self.last_updated,
        })
    }

    /// Decrypt a single field.
    pub fn reveal_field(&self, field: CredentialField, vault_key: &VaultKey) -> Result<FieldValue> {
        let credential_key = self.get_decrypted_key(vault_key)?;
        reveal(&credential_key, self.fields.get(field))
    }

    /// Re-encrypt one field under the existing credential key.
    ///
    /// `None` clears the field back to absent.
    pub fn update_field(
        &mut self,
        field: CredentialField,
        new_value: Option<&str>,
        vault_key: &VaultKey,
    ) -> Result<()> {
        let credential_key = self.get_decrypted_key(vault_key)?;
        self.update_field_with_key(field, new_value, &credential_key)
    }

    /// Same as `update_field` with an already unwrapped key, for batches.
    pub fn update_field_with_key(
        &mut self,
        field: CredentialField,
        new_value: Option<&str>,
        credential_key: &CredentialKey,
    ) -> Result<()> {
        let state = match new_value {
            Some(value) => FieldState::Present(credential_key.encrypt(value)?),
            None => FieldState::Absent,
        };
        self.fields.set(field, state);
        self.last_updated = Utc::now();
        debug!(credential = %self.uuid, %field, "field re-encrypted");
        Ok(())
    }

    /// Re-wrap the credential key under a new vault key.
    ///
    /// Field ciphertext is left untouched.
    pub fn rewrap_key(&mut self, old_vault_key: &VaultKey, new_vault_key: &VaultKey) -> Result<()> {
        let credential_key = self.get_decrypted_key(old_vault_key)?;
        self.encrypted_key = wrap_credential_key(&credential_key, new_vault_key)?;
        Ok(())
    }
}

fn reveal(credential_key: &CredentialKey, state: &FieldState) -> Result<FieldValue> {
    match state {
        FieldState::Absent => Ok(FieldValue::NotProvided),
        FieldState::Present(token) => {
            let plain = credential_key.decrypt(token)?;
            Ok(FieldValue::Value(plain.as_str().to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::KdfParams;
    use crate::crypto::keys::derive_vault_key_with_params;
    use crate::errors::VaultSafeError;
    use crate::vault::fields::NOT_PROVIDED;

    fn key(pw: &str) -> VaultKey {
        derive_vault_key_with_params(pw, &KdfParams { iterations: 1_000 }).unwrap()
    }

    fn github_fields() -> CredentialFields {
        CredentialFields {
            username: Some("alice".into()),
            password: Some("p@ssw0rd".into()),
            ..CredentialFields::default()
        }
    }

    #[test]
    fn create_then_to_plaintext() {
        let vk = key("master");
        let cred = Credential::create_encrypted("GitHub", &github_fields(), &vk).unwrap();
        assert_eq!(cred.encryption_algorithm, "Fernet");
        assert!(cred.field_state(CredentialField::Password).is_present());
        assert!(!cred.field_state(CredentialField::Url).is_present());

        let plain = cred.to_plaintext(&vk).unwrap();
        assert_eq!(plain.name, "GitHub");
        assert_eq!(plain.fields.username.as_option(), Some("alice"));
        assert_eq!(plain.fields.password.as_option(), Some("p@ssw0rd"));
        assert_eq!(plain.fields.url.to_string(), NOT_PROVIDED);
    }

    #[test]
    fn ciphertext_does_not_contain_plaintext() {
        let vk = key("master");
        let cred = Credential::create_encrypted("GitHub", &github_fields(), &vk).unwrap();
        let token = cred.field_state(CredentialField::Password).ciphertext().unwrap();
        assert!(!token.contains("p@ssw0rd"));
    }

    #[test]
    fn empty_string_is_not_absent() {
        let vk = key("master");
        let fields = CredentialFields {
            password: Some(String::new()),
            ..CredentialFields::default()
        };
        let cred = Credential::create_encrypted("Blank", &fields, &vk).unwrap();
        assert!(cred.field_state(CredentialField::Password).is_present());
        assert!(!cred.field_state(CredentialField::Username).is_present());

        let plain = cred.to_plaintext(&vk).unwrap();
        assert_eq!(plain.fields.password, FieldValue::Value(String::new()));
        assert_eq!(plain.fields.username, FieldValue::NotProvided);
    }

    #[test]
    fn wrong_vault_key_is_an_integrity_error() {
        let cred = Credential::create_encrypted("X", &github_fields(), &key("a")).unwrap();
        assert!(matches!(
            cred.get_decrypted_key(&key("b")),
            Err(VaultSafeError::DecryptionFailed)
        ));
        assert!(matches!(
            cred.to_plaintext(&key("b")),
            Err(VaultSafeError::DecryptionFailed)
        ));
    }

    #[test]
    fn update_field_keeps_credential_key() {
        let vk = key("master");
        let mut cred = Credential::create_encrypted("GitHub", &github_fields(), &vk).unwrap();
        let wrapped_before = cred.encrypted_key.clone();
        let key_before = cred.get_decrypted_key(&vk).unwrap();

        cred.update_field(CredentialField::Password, Some("n3w"), &vk)
            .unwrap();
        cred.update_field(CredentialField::Url, Some("https://github.com"), &vk)
            .unwrap();
        cred.update_field(CredentialField::Username, None, &vk).unwrap();

        assert_eq!(cred.encrypted_key, wrapped_before);
        // The old unwrapped key still decrypts the new ciphertext.
        let token = cred.field_state(CredentialField::Password).ciphertext().unwrap();
        assert_eq!(key_before.decrypt(token).unwrap().as_str(), "n3w");

        let plain = cred.to_plaintext(&vk).unwrap();
        assert_eq!(plain.fields.url.as_option(), Some("https://github.com"));
        assert_eq!(plain.fields.username, FieldValue::NotProvided);
    }

    #[test]
    fn rewrap_moves_to_new_vault_key_without_touching_fields() {
        let old = key("old");
        let new = key("new");
        let mut cred = Credential::create_encrypted("GitHub", &github_fields(), &old).unwrap();
        let fields_before = cred.fields.clone();

        cred.rewrap_key(&old, &new).unwrap();

        assert_eq!(cred.fields, fields_before);
        assert!(cred.get_decrypted_key(&old).is_err());
        let plain = cred.to_plaintext(&new).unwrap();
        assert_eq!(plain.fields.password.as_option(), Some("p@ssw0rd"));
    }

    #[test]
    fn credentials_get_independent_keys() {
        let vk = key("master");
        let a = Credential::create_encrypted("A", &github_fields(), &vk).unwrap();
        let b = Credential::create_encrypted("B", &github_fields(), &vk).unwrap();
        let key_a = a.get_decrypted_key(&vk).unwrap();
        let key_b = b.get_decrypted_key(&vk).unwrap();
        assert_ne!(
            key_a.as_fernet().to_base64().as_str(),
            key_b.as_fernet().to_base64().as_str()
        );

        // A's key cannot open B's fields.
        let b_token = b.field_state(CredentialField::Password).ciphertext().unwrap();
        assert!(key_a.decrypt(b_token).is_err());
    }

    #[test]
    fn reveal_single_field() {
        let vk = key("master");
        let cred = Credential::create_encrypted("GitHub", &github_fields(), &vk).unwrap();
        assert_eq!(
            cred.reveal_field(CredentialField::Password, &vk).unwrap(),
            FieldValue::Value("p@ssw0rd".into())
        );
        assert_eq!(
            cred.reveal_field(CredentialField::Token, &vk).unwrap(),
            FieldValue::NotProvided
        );
    }
}
