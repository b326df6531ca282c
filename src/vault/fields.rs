//! The eight secret fields of a credential and their states.
//!
//! `Fields<T>` is instantiated three ways:
//! - `Fields<Option<String>>`: plaintext input (`CredentialFields`)
//! - `Fields<FieldState>`: what is stored (`EncryptedFields`)
//! - `Fields<FieldValue>`: what a reader gets back (`RevealedFields`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::VaultSafeError;

/// Display text for a field that was never set.
pub const NOT_PROVIDED: &str = "Not Provided";

/// One of the secret fields of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialField {
    Url,
    Username,
    Password,
    RecoveryKey,
    PrimaryEmail,
    SecondaryEmail,
    Token,
    Notes,
}

impl CredentialField {
    /// Every field, in display order.
    pub const ALL: [CredentialField; 8] = [
        Self::Url,
        Self::Username,
        Self::Password,
        Self::RecoveryKey,
        Self::PrimaryEmail,
        Self::SecondaryEmail,
        Self::Token,
        Self::Notes,
    ];

    /// Column / JSON key name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Username => "username",
            Self::Password => "password",
            Self::RecoveryKey => "recovery_key",
            Self::PrimaryEmail => "primary_email",
            Self::SecondaryEmail => "secondary_email",
            Self::Token => "token",
            Self::Notes => "notes",
        }
    }

    /// Human-readable label for tables.
    pub fn label(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Username => "Username",
            Self::Password => "Password",
            Self::RecoveryKey => "Recovery Key",
            Self::PrimaryEmail => "Primary Email",
            Self::SecondaryEmail => "Secondary Email",
            Self::Token => "Token",
            Self::Notes => "Notes",
        }
    }

    /// Fields read without echo when `add` prompts for them.
    pub fn is_sensitive(self) -> bool {
        matches!(self, Self::Password | Self::RecoveryKey | Self::Token)
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialField {
    type Err = VaultSafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| VaultSafeError::CommandFailed(format!("unknown field '{s}'")))
    }
}

/// Stored state of one field: never set, or set to a ciphertext token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldState {
    #[default]
    Absent,
    Present(String),
}

impl FieldState {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// The ciphertext, if any.
    pub fn ciphertext(&self) -> Option<&str> {
        match self {
            Self::Absent => None,
            Self::Present(token) => Some(token),
        }
    }

    /// Build from a nullable storage column.
    pub fn from_column(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Present)
    }
}

/// Decrypted value of one field.
///
/// Serializes as `null` / string so exports round-trip through `Option`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FieldValue {
    #[default]
    NotProvided,
    Value(String),
}

impl FieldValue {
    pub fn as_option(&self) -> Option<&str> {
        match self {
            Self::NotProvided => None,
            Self::Value(v) => Some(v),
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::NotProvided, Self::Value)
    }
}

impl From<FieldValue> for Option<String> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::NotProvided => None,
            FieldValue::Value(v) => Some(v),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProvided => f.write_str(NOT_PROVIDED),
            Self::Value(v) => f.write_str(v),
        }
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProvided => f.write_str("NotProvided"),
            Self::Value(_) => f.write_str("Value([redacted])"),
        }
    }
}

/// One value per secret field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields<T> {
    pub url: T,
    pub username: T,
    pub password: T,
    pub recovery_key: T,
    pub primary_email: T,
    pub secondary_email: T,
    pub token: T,
    pub notes: T,
}

impl<T> Fields<T> {
    pub fn get(&self, field: CredentialField) -> &T {
        match field {
            CredentialField::Url => &self.url,
            CredentialField::Username => &self.username,
            CredentialField::Password => &self.password,
            CredentialField::RecoveryKey => &self.recovery_key,
            CredentialField::PrimaryEmail => &self.primary_email,
            CredentialField::SecondaryEmail => &self.secondary_email,
            CredentialField::Token => &self.token,
            CredentialField::Notes => &self.notes,
        }
    }

    pub fn get_mut(&mut self, field: CredentialField) -> &mut T {
        match field {
            CredentialField::Url => &mut self.url,
            CredentialField::Username => &mut self.username,
            CredentialField::Password => &mut self.password,
            CredentialField::RecoveryKey => &mut self.recovery_key,
            CredentialField::PrimaryEmail => &mut self.primary_email,
            CredentialField::SecondaryEmail => &mut self.secondary_email,
            CredentialField::Token => &mut self.token,
            CredentialField::Notes => &mut self.notes,
        }
    }

    pub fn set(&mut self, field: CredentialField, value: T) {
        *self.get_mut(field) = value;
    }

    /// Build every field with a fallible function, stopping at the first
    /// error.
    pub fn try_from_fn<E>(mut f: impl FnMut(CredentialField) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            url: f(CredentialField::Url)?,
            username: f(CredentialField::Username)?,
            password: f(CredentialField::Password)?,
            recovery_key: f(CredentialField::RecoveryKey)?,
            primary_email: f(CredentialField::PrimaryEmail)?,
            secondary_email: f(CredentialField::SecondaryEmail)?,
            token: f(CredentialField::Token)?,
            notes: f(CredentialField::Notes)?,
        })
    }

    /// Iterate `(field, value)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (CredentialField, &T)> {
        CredentialField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// Plaintext input for a new credential. `None` means "not provided".
pub type CredentialFields = Fields<Option<String>>;

/// Stored field states.
pub type EncryptedFields = Fields<FieldState>;

/// Decrypted field values.
pub type RevealedFields = Fields<FieldValue>;
