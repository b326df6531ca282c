//! Import / export documents.
//!
//! Exports are decrypted JSON. Imports accept that JSON (or a bare array of
//! records) and CSV with one column per field plus `name` and
//! `mnemonics`. In both formats `mnemonics` may be a list or one
//! comma-separated string.

use std::io::Read;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::credential::PlaintextCredential;
use super::fields::CredentialFields;
use crate::errors::{Result, VaultSafeError};

/// One record to import.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialImport {
    pub name: String,
    #[serde(flatten)]
    pub fields: CredentialFields,
    #[serde(default, deserialize_with = "mnemonic_list")]
    pub mnemonics: Vec<String>,
}

/// Outcome of a batch import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Names of credentials that were created.
    pub imported: Vec<String>,
    /// `(name, reason)` for records that were skipped.
    pub skipped: Vec<(String, String)>,
}

/// Header of an export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub exported_date: DateTime<Utc>,
    pub credential_count: usize,
    pub file_encrypted: bool,
}

/// A full export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub credentials: Vec<PlaintextCredential>,
}

impl ExportDocument {
    pub fn new(credentials: Vec<PlaintextCredential>) -> Self {
        Self {
            metadata: ExportMetadata {
                exported_date: Utc::now(),
                credential_count: credentials.len(),
                file_encrypted: false,
            },
            credentials,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| VaultSafeError::SerializationError(format!("export JSON: {e}")))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Document { credentials: Vec<CredentialImport> },
    List(Vec<CredentialImport>),
}

/// Parse a JSON import (export document or bare array).
pub fn parse_json(input: &str) -> Result<Vec<CredentialImport>> {
    let doc: ImportDocument = serde_json::from_str(input)
        .map_err(|e| VaultSafeError::SerializationError(format!("import JSON: {e}")))?;
    Ok(match doc {
        ImportDocument::Document { credentials } => credentials,
        ImportDocument::List(list) => list,
    })
}

/// Parse a CSV import with a header row.
pub fn parse_csv(reader: impl Read) -> Result<Vec<CredentialImport>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (line, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| {
            VaultSafeError::SerializationError(format!("import CSV row {}: {e}", line + 1))
        })?;
        records.push(row.into_import());
    }
    Ok(records)
}

#[derive(Deserialize)]
struct CsvRow {
    name: String,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    recovery_key: Option<String>,
    primary_email: Option<String>,
    secondary_email: Option<String>,
    token: Option<String>,
    notes: Option<String>,
    mnemonics: Option<String>,
}

impl CsvRow {
    fn into_import(self) -> CredentialImport {
        CredentialImport {
            name: self.name,
            fields: CredentialFields {
                url: self.url,
                username: self.username,
                password: self.password,
                recovery_key: self.recovery_key,
                primary_email: self.primary_email,
                secondary_email: self.secondary_email,
                token: self.token,
                notes: self.notes,
            },
            mnemonics: split_mnemonics(self.mnemonics.as_deref().unwrap_or_default()),
        }
    }
}

/// Split `"gh, github"` into trimmed, non-empty, distinct names.
pub fn split_mnemonics(raw: &str) -> Vec<String> {
    dedup_mnemonics(raw.split(','))
}

fn dedup_mnemonics<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names.map(str::trim).filter(|m| !m.is_empty()) {
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}

fn mnemonic_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
        Missing(Option<()>),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::List(list) => dedup_mnemonics(list.iter().map(String::as_str)),
        Raw::Joined(joined) => split_mnemonics(&joined),
        Raw::Missing(_) => Vec::new(),
    })
}
