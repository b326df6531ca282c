//! High-level vault operations used by CLI commands.
//!
//! `VaultStore` owns the SQLite connection holding the vault row, the
//! credentials and their mnemonics. Every operation that touches more
//! than one row runs inside a transaction, so a failure leaves the
//! database exactly as it was.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::crypto::hash::constant_time_eq;
use crate::crypto::kdf::KdfParams;
use crate::crypto::keys::VaultKey;
use crate::errors::{Result, VaultSafeError};

use super::credential::{Credential, PlaintextCredential};
use super::fields::{CredentialField, CredentialFields, FieldState, Fields};
use super::record::{VaultProfile, VaultRecord, VaultUpdate};
use super::transfer::{CredentialImport, ImportReport};

/// File name of the vault database inside the data directory.
pub const DB_FILE_NAME: &str = "vaultsafe.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vault (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid                 TEXT NOT NULL UNIQUE,
    name                 TEXT NOT NULL,
    owner_name           TEXT NOT NULL,
    owner_email          TEXT,
    master_password_hash TEXT NOT NULL,
    password_salt        TEXT NOT NULL,
    vault_key_hash       TEXT NOT NULL,
    kdf_iterations       INTEGER NOT NULL,
    session_secret_key   TEXT NOT NULL,
    session_salt         TEXT NOT NULL,
    session_check        INTEGER NOT NULL DEFAULT 1,
    session_expiration   INTEGER NOT NULL,
    date_created         TEXT NOT NULL,
    last_updated         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS credential (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    uuid                 TEXT NOT NULL UNIQUE,
    name                 TEXT NOT NULL,
    url                  TEXT,
    username             TEXT,
    password             TEXT,
    recovery_key         TEXT,
    primary_email        TEXT,
    secondary_email      TEXT,
    token                TEXT,
    notes                TEXT,
    encrypted_key        TEXT NOT NULL,
    encryption_algorithm TEXT NOT NULL DEFAULT 'Fernet',
    date_created         TEXT NOT NULL,
    last_updated         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS mnemonic (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT NOT NULL UNIQUE,
    credential_id INTEGER NOT NULL REFERENCES credential(id) ON DELETE CASCADE
);
";

const VAULT_COLUMNS: &str = "id, uuid, name, owner_name, owner_email, master_password_hash, \
     password_salt, vault_key_hash, kdf_iterations, session_secret_key, session_salt, \
     session_check, session_expiration, date_created, last_updated";

const CREDENTIAL_COLUMNS: &str = "id, uuid, name, url, username, password, recovery_key, \
     primary_email, secondary_email, token, notes, encrypted_key, encryption_algorithm, \
     date_created, last_updated";

/// Changes applied by `update_credential_fields`.
///
/// A field mapped to `None` is cleared back to absent.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    pub name: Option<String>,
    pub fields: BTreeMap<CredentialField, Option<String>>,
    pub add_mnemonics: Vec<String>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.fields.is_empty() && self.add_mnemonics.is_empty()
    }
}

/// The main vault handle. Open one with `VaultStore::open`, then call
/// `initialize_vault` once or `unlock` for an existing vault.
pub struct VaultStore {
    /// Path of the database file (`:memory:` for in-memory stores).
    path: PathBuf,

    conn: Connection,
}

impl VaultStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open (or create) the database at `path` and make sure the schema
    /// exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(path, perms) {
                debug!(error = %e, path = %path.display(), "could not restrict database permissions");
            }
        }

        Self::with_connection(path.to_path_buf(), conn)
    }

    /// A throwaway store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(PathBuf::from(":memory:"), Connection::open_in_memory()?)
    }

    fn with_connection(path: PathBuf, conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        debug!(path = %path.display(), "vault database opened");
        Ok(Self { path, conn })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the whole data directory: database, session file and
    /// audit log.
    pub fn destroy(data_dir: &Path) -> Result<()> {
        if data_dir.exists() {
            std::fs::remove_dir_all(data_dir)?;
            info!(path = %data_dir.display(), "vault destroyed");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Vault record
    // ------------------------------------------------------------------

    pub fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM vault", [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Create the vault row. Fails if this store already holds a vault.
    pub fn initialize_vault(
        &mut self,
        master_password: &str,
        profile: &VaultProfile,
        params: &KdfParams,
    ) -> Result<VaultRecord> {
        if self.is_initialized()? {
            return Err(VaultSafeError::VaultAlreadyExists(self.path.clone()));
        }

        let (mut record, _vault_key) = VaultRecord::create(master_password, profile, params)?;
        self.conn.execute(
            "INSERT INTO vault (uuid, name, owner_name, owner_email, master_password_hash,
                 password_salt, vault_key_hash, kdf_iterations, session_secret_key,
                 session_salt, session_check, session_expiration, date_created, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.uuid,
                record.name,
                record.owner_name,
                record.owner_email,
                record.master_password_hash,
                record.password_salt,
                record.vault_key_hash,
                record.kdf_iterations,
                record.session_secret_key,
                record.session_salt,
                record.session_check,
                expiration_to_sql(record.session_expiration)?,
                record.date_created.to_rfc3339(),
                record.last_updated.to_rfc3339(),
            ],
        )?;
        record.id = self.conn.last_insert_rowid();

        info!(vault = %record.uuid, iterations = record.kdf_iterations, "vault initialized");
        Ok(record)
    }

    /// The vault row.
    pub fn vault(&self) -> Result<VaultRecord> {
        load_vault(&self.conn)?.ok_or(VaultSafeError::VaultNotInitialized)
    }

    pub fn verify_master_password(&self, candidate: &str) -> Result<bool> {
        Ok(self.vault()?.check_password(candidate))
    }

    /// Derive the vault key with the stored KDF parameters. Does not
    /// check the password.
    pub fn derive_vault_key(&self, candidate: &str) -> Result<VaultKey> {
        self.vault()?.derive_vault_key(candidate)
    }

    /// Verify `candidate` and return the vault key.
    pub fn unlock(&self, candidate: &str) -> Result<VaultKey> {
        let vault = self.vault()?;
        if !vault.check_password(candidate) {
            return Err(VaultSafeError::AuthenticationFailed);
        }
        let vault_key = vault.derive_vault_key(candidate)?;
        if !constant_time_eq(&vault_key.fingerprint(), &vault.vault_key_hash) {
            warn!("vault key fingerprint does not match the stored hash");
            return Err(VaultSafeError::AuthenticationFailed);
        }
        debug!("vault unlocked");
        Ok(vault_key)
    }

    /// Apply metadata edits to the vault row.
    pub fn update_vault(&mut self, update: &VaultUpdate) -> Result<VaultRecord> {
        let mut vault = self.vault()?;
        vault.apply_update(update)?;
        save_vault(&self.conn, &vault)?;
        info!(vault = %vault.uuid, "vault metadata updated");
        Ok(vault)
    }

    /// Change the master password.
    ///
    /// Every credential key is re-wrapped under the new vault key and the
    /// password verifier is replaced, all in one transaction. Field
    /// ciphertext is not touched.
    pub fn rotate_master_password(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        let vault = self.vault()?;
        if !vault.check_password(old_password) {
            return Err(VaultSafeError::AuthenticationFailed);
        }

        let rewrapped = self
            .rotate_in_transaction(vault, old_password, new_password)
            .map_err(|e| VaultSafeError::RotationFailed(e.to_string()))?;

        info!(credentials = rewrapped, "master password rotated");
        Ok(())
    }

    fn rotate_in_transaction(
        &mut self,
        mut vault: VaultRecord,
        old_password: &str,
        new_password: &str,
    ) -> Result<usize> {
        let old_key = vault.derive_vault_key(old_password)?;
        let new_key = vault.derive_vault_key(new_password)?;

        let tx = self.conn.transaction()?;
        let mut credentials = load_all_credentials(&tx)?;
        for credential in &mut credentials {
            credential.rewrap_key(&old_key, &new_key)?;
            tx.execute(
                "UPDATE credential SET encrypted_key = ?1 WHERE id = ?2",
                params![credential.encrypted_key, credential.id],
            )?;
            debug!(credential = %credential.uuid, "credential key re-wrapped");
        }

        vault.set_master_password_hash(new_password)?;
        vault.set_vault_key_hash(&new_key);
        vault.last_updated = Utc::now();
        save_vault(&tx, &vault)?;
        tx.commit()?;

        Ok(credentials.len())
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------

    /// Encrypt and store a credential together with its mnemonics.
    pub fn create_credential(
        &mut self,
        name: &str,
        fields: &CredentialFields,
        mnemonics: &[String],
        vault_key: &VaultKey,
    ) -> Result<Credential> {
        self.ensure_vault_key(vault_key)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(VaultSafeError::CommandFailed(
                "credential name must not be empty".into(),
            ));
        }

        let mut credential = Credential::create_encrypted(name, fields, vault_key)?;

        let tx = self.conn.transaction()?;
        insert_credential(&tx, &mut credential)?;
        credential.mnemonics = insert_mnemonics(&tx, mnemonics, credential.id)?;
        tx.commit()?;

        info!(credential = %credential.uuid, mnemonics = credential.mnemonics.len(), "credential created");
        Ok(credential)
    }

    /// Attach mnemonics to an existing credential.
    ///
    /// The whole batch is rejected if any name is empty, repeated within
    /// the batch, or already in use.
    pub fn register_mnemonics(&mut self, names: &[String], credential_id: i64) -> Result<Vec<String>> {
        let tx = self.conn.transaction()?;
        let added = insert_mnemonics(&tx, names, credential_id)?;
        tx.commit()?;
        Ok(added)
    }

    /// Look a credential up by mnemonic, falling back to its uuid.
    pub fn find_credential(&self, identifier: &str) -> Result<Credential> {
        find_in(&self.conn, identifier)
    }

    /// Find and decrypt a credential.
    pub fn read_credential(&self, identifier: &str, vault_key: &VaultKey) -> Result<PlaintextCredential> {
        self.find_credential(identifier)?.to_plaintext(vault_key)
    }

    /// Rename, re-encrypt fields, and attach new mnemonics in one
    /// transaction. The credential key is kept.
    pub fn update_credential_fields(
        &mut self,
        identifier: &str,
        update: &CredentialUpdate,
        vault_key: &VaultKey,
    ) -> Result<Credential> {
        self.ensure_vault_key(vault_key)?;

        let tx = self.conn.transaction()?;
        let mut credential = find_in(&tx, identifier)?;

        if let Some(ref name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(VaultSafeError::CommandFailed(
                    "credential name must not be empty".into(),
                ));
            }
            credential.name = name.to_string();
        }

        if !update.fields.is_empty() {
            let credential_key = credential.get_decrypted_key(vault_key)?;
            for (field, value) in &update.fields {
                credential.update_field_with_key(*field, value.as_deref(), &credential_key)?;
            }
        }

        let added = insert_mnemonics(&tx, &update.add_mnemonics, credential.id)?;
        credential.mnemonics.extend(added);
        credential.last_updated = Utc::now();

        save_credential(&tx, &credential)?;
        tx.commit()?;

        info!(credential = %credential.uuid, fields = update.fields.len(), "credential updated");
        Ok(credential)
    }

    /// Delete a credential; its mnemonics go with it.
    pub fn delete_credential(&mut self, identifier: &str) -> Result<Credential> {
        let credential = self.find_credential(identifier)?;
        self.conn
            .execute("DELETE FROM credential WHERE id = ?1", params![credential.id])?;
        info!(credential = %credential.uuid, "credential deleted");
        Ok(credential)
    }

    /// Every credential, ordered by name.
    pub fn list_credentials(&self) -> Result<Vec<Credential>> {
        load_all_credentials(&self.conn)
    }

    /// Credentials whose name or any mnemonic contains `keyword`,
    /// ignoring case. Secret fields are never searched.
    pub fn search_credentials(&self, keyword: &str) -> Result<Vec<Credential>> {
        let needle = keyword.trim().to_lowercase();
        Ok(self
            .list_credentials()?
            .into_iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.mnemonics.iter().any(|m| m.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub fn credential_count(&self) -> Result<usize> {
        count_rows(&self.conn, "SELECT COUNT(*) FROM credential")
    }

    pub fn mnemonic_count(&self) -> Result<usize> {
        count_rows(&self.conn, "SELECT COUNT(*) FROM mnemonic")
    }

    // ------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------

    /// Create each record on its own. A record that fails on its name or
    /// its mnemonics is skipped and reported; the rest still go in.
    pub fn import_credentials(
        &mut self,
        records: Vec<CredentialImport>,
        vault_key: &VaultKey,
    ) -> Result<ImportReport> {
        self.ensure_vault_key(vault_key)?;

        let mut report = ImportReport::default();
        for record in records {
            match self.create_credential(&record.name, &record.fields, &record.mnemonics, vault_key) {
                Ok(credential) => report.imported.push(credential.name),
                Err(
                    e @ (VaultSafeError::DuplicateMnemonic(_)
                    | VaultSafeError::InvalidMnemonic(_)
                    | VaultSafeError::CommandFailed(_)),
                ) => {
                    warn!(name = %record.name, error = %e, "import record skipped");
                    report.skipped.push((record.name, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            imported = report.imported.len(),
            skipped = report.skipped.len(),
            "import finished"
        );
        Ok(report)
    }

    /// Decrypt every credential.
    pub fn export_credentials(&self, vault_key: &VaultKey) -> Result<Vec<PlaintextCredential>> {
        self.list_credentials()?
            .iter()
            .map(|credential| credential.to_plaintext(vault_key))
            .collect()
    }

    /// Reject a vault key that does not belong to this vault before any
    /// credential is written with it.
    fn ensure_vault_key(&self, vault_key: &VaultKey) -> Result<()> {
        let vault = self.vault()?;
        if constant_time_eq(&vault_key.fingerprint(), &vault.vault_key_hash) {
            Ok(())
        } else {
            Err(VaultSafeError::AuthenticationFailed)
        }
    }
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore").field("path", &self.path).finish()
    }
}

// ----------------------------------------------------------------------
// Row helpers. They take `&Connection` so a `Transaction` can be passed.
// ----------------------------------------------------------------------

fn load_vault(conn: &Connection) -> Result<Option<VaultRecord>> {
    let sql = format!("SELECT {VAULT_COLUMNS} FROM vault ORDER BY id LIMIT 1");
    Ok(conn.query_row(&sql, [], vault_from_row).optional()?)
}

fn vault_from_row(row: &Row<'_>) -> rusqlite::Result<VaultRecord> {
    let expiration: i64 = row.get(12)?;
    Ok(VaultRecord {
        id: row.get(0)?,
        uuid: row.get(1)?,
        name: row.get(2)?,
        owner_name: row.get(3)?,
        owner_email: row.get(4)?,
        master_password_hash: row.get(5)?,
        password_salt: row.get(6)?,
        vault_key_hash: row.get(7)?,
        kdf_iterations: row.get(8)?,
        session_secret_key: row.get(9)?,
        session_salt: row.get(10)?,
        session_check: row.get(11)?,
        session_expiration: u64::try_from(expiration)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(12, Type::Integer, Box::new(e)))?,
        date_created: timestamp(row, 13)?,
        last_updated: timestamp(row, 14)?,
    })
}

fn save_vault(conn: &Connection, vault: &VaultRecord) -> Result<()> {
    conn.execute(
        "UPDATE vault SET name = ?1, owner_name = ?2, owner_email = ?3,
             master_password_hash = ?4, password_salt = ?5, vault_key_hash = ?6,
             session_check = ?7, session_expiration = ?8, last_updated = ?9
         WHERE id = ?10",
        params![
            vault.name,
            vault.owner_name,
            vault.owner_email,
            vault.master_password_hash,
            vault.password_salt,
            vault.vault_key_hash,
            vault.session_check,
            expiration_to_sql(vault.session_expiration)?,
            vault.last_updated.to_rfc3339(),
            vault.id,
        ],
    )?;
    Ok(())
}

fn expiration_to_sql(secs: u64) -> Result<i64> {
    i64::try_from(secs)
        .map_err(|_| VaultSafeError::ConfigError(format!("session expiration {secs} is too large")))
}

fn insert_credential(conn: &Connection, credential: &mut Credential) -> Result<()> {
    let f = &credential.fields;
    conn.execute(
        "INSERT INTO credential (uuid, name, url, username, password, recovery_key,
             primary_email, secondary_email, token, notes, encrypted_key,
             encryption_algorithm, date_created, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            credential.uuid,
            credential.name,
            f.url.ciphertext(),
            f.username.ciphertext(),
            f.password.ciphertext(),
            f.recovery_key.ciphertext(),
            f.primary_email.ciphertext(),
            f.secondary_email.ciphertext(),
            f.token.ciphertext(),
            f.notes.ciphertext(),
            credential.encrypted_key,
            credential.encryption_algorithm,
            credential.date_created.to_rfc3339(),
            credential.last_updated.to_rfc3339(),
        ],
    )?;
    credential.id = conn.last_insert_rowid();
    Ok(())
}

fn save_credential(conn: &Connection, credential: &Credential) -> Result<()> {
    let f = &credential.fields;
    conn.execute(
        "UPDATE credential SET name = ?1, url = ?2, username = ?3, password = ?4,
             recovery_key = ?5, primary_email = ?6, secondary_email = ?7, token = ?8,
             notes = ?9, encrypted_key = ?10, last_updated = ?11
         WHERE id = ?12",
        params![
            credential.name,
            f.url.ciphertext(),
            f.username.ciphertext(),
            f.password.ciphertext(),
            f.recovery_key.ciphertext(),
            f.primary_email.ciphertext(),
            f.secondary_email.ciphertext(),
            f.token.ciphertext(),
            f.notes.ciphertext(),
            credential.encrypted_key,
            credential.last_updated.to_rfc3339(),
            credential.id,
        ],
    )?;
    Ok(())
}

fn credential_from_row(row: &Row<'_>) -> rusqlite::Result<Credential> {
    let fields = Fields::try_from_fn(|field| {
        row.get::<_, Option<String>>(field.as_str())
            .map(FieldState::from_column)
    })?;

    Ok(Credential {
        id: row.get(0)?,
        uuid: row.get(1)?,
        name: row.get(2)?,
        fields,
        encrypted_key: row.get(11)?,
        encryption_algorithm: row.get(12)?,
        mnemonics: Vec::new(),
        date_created: timestamp(row, 13)?,
        last_updated: timestamp(row, 14)?,
    })
}

fn load_credential(conn: &Connection, id: i64) -> Result<Option<Credential>> {
    let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM credential WHERE id = ?1");
    let credential = conn
        .query_row(&sql, params![id], credential_from_row)
        .optional()?;
    match credential {
        Some(mut credential) => {
            credential.mnemonics = load_mnemonics(conn, credential.id)?;
            Ok(Some(credential))
        }
        None => Ok(None),
    }
}

fn load_all_credentials(conn: &Connection) -> Result<Vec<Credential>> {
    let sql = format!("SELECT {CREDENTIAL_COLUMNS} FROM credential ORDER BY name COLLATE NOCASE, id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], credential_from_row)?;

    let mut credentials = Vec::new();
    for row in rows {
        let mut credential = row?;
        credential.mnemonics = load_mnemonics(conn, credential.id)?;
        credentials.push(credential);
    }
    Ok(credentials)
}

fn load_mnemonics(conn: &Connection, credential_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM mnemonic WHERE credential_id = ?1 ORDER BY id")?;
    let names = stmt
        .query_map(params![credential_id], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

fn find_in(conn: &Connection, identifier: &str) -> Result<Credential> {
    let by_mnemonic: Option<i64> = conn
        .query_row(
            "SELECT credential_id FROM mnemonic WHERE name = ?1",
            params![identifier],
            |row| row.get(0),
        )
        .optional()?;

    let id = match by_mnemonic {
        Some(id) => Some(id),
        None => conn
            .query_row(
                "SELECT id FROM credential WHERE uuid = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?,
    };

    match id {
        Some(id) => load_credential(conn, id)?,
        None => None,
    }
    .ok_or_else(|| VaultSafeError::CredentialNotFound(identifier.to_string()))
}

/// The one place mnemonics are validated and written.
fn insert_mnemonics(conn: &Connection, names: &[String], credential_id: i64) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut accepted = Vec::with_capacity(names.len());
    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            return Err(VaultSafeError::InvalidMnemonic(
                "mnemonic must not be empty".into(),
            ));
        }
        if name.contains(',') || name.chars().any(char::is_whitespace) {
            return Err(VaultSafeError::InvalidMnemonic(format!(
                "'{name}' must not contain commas or whitespace"
            )));
        }
        if !seen.insert(name) {
            return Err(VaultSafeError::DuplicateMnemonic(name.to_string()));
        }
        accepted.push(name.to_string());
    }

    for name in &accepted {
        let taken: Option<i64> = conn
            .query_row(
                "SELECT id FROM mnemonic WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        if taken.is_some() {
            return Err(VaultSafeError::DuplicateMnemonic(name.clone()));
        }

        conn.execute(
            "INSERT INTO mnemonic (name, credential_id) VALUES (?1, ?2)",
            params![name, credential_id],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref err, _)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                VaultSafeError::DuplicateMnemonic(name.clone())
            }
            other => VaultSafeError::Storage(other),
        })?;
    }

    debug!(credential_id, count = accepted.len(), "mnemonics registered");
    Ok(accepted)
}

fn count_rows(conn: &Connection, sql: &str) -> Result<usize> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(usize::try_from(count).unwrap_or_default())
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::fields::FieldValue;

    const PW: &str = "Sys$ecure1";

    fn params() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    fn store_with_vault() -> (VaultStore, VaultKey) {
        let mut store = VaultStore::open_in_memory().unwrap();
        store
            .initialize_vault(PW, &VaultProfile::default(), &params())
            .unwrap();
        let key = store.unlock(PW).unwrap();
        (store, key)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn github() -> CredentialFields {
        CredentialFields {
            username: Some("alice".into()),
            password: Some("p@ss".into()),
            ..Default::default()
        }
    }

    #[test]
    fn empty_store_is_not_initialized() {
        let store = VaultStore::open_in_memory().unwrap();
        assert!(!store.is_initialized().unwrap());
        assert!(matches!(store.vault(), Err(VaultSafeError::VaultNotInitialized)));
    }

    #[test]
    fn initialize_twice_fails() {
        let (mut store, _) = store_with_vault();
        let err = store
            .initialize_vault(PW, &VaultProfile::default(), &params())
            .unwrap_err();
        assert!(matches!(err, VaultSafeError::VaultAlreadyExists(_)));
    }

    #[test]
    fn unlock_rejects_wrong_password() {
        let (store, _) = store_with_vault();
        assert!(matches!(store.unlock("nope"), Err(VaultSafeError::AuthenticationFailed)));
        assert!(!store.verify_master_password("nope").unwrap());
        assert!(store.verify_master_password(PW).unwrap());
    }

    #[test]
    fn vault_row_round_trips() {
        let mut store = VaultStore::open_in_memory().unwrap();
        let profile = VaultProfile {
            name: Some("laptop".into()),
            owner_name: Some("Alice".into()),
            owner_email: Some("alice@example.com".into()),
        };
        let created = store.initialize_vault(PW, &profile, &params()).unwrap();
        let loaded = store.vault().unwrap();
        assert_eq!(loaded.uuid, created.uuid);
        assert_eq!(loaded.name, "laptop");
        assert_eq!(loaded.owner_email.as_deref(), Some("alice@example.com"));
        assert_eq!(loaded.kdf_iterations, 1_000);
        assert_eq!(loaded.session_secret_key, created.session_secret_key);
    }

    #[test]
    fn create_and_find_by_mnemonic_or_uuid() {
        let (mut store, key) = store_with_vault();
        let created = store
            .create_credential("GitHub", &github(), &names(&["gh", "github"]), &key)
            .unwrap();

        let by_mnemonic = store.find_credential("gh").unwrap();
        assert_eq!(by_mnemonic.uuid, created.uuid);
        assert_eq!(by_mnemonic.mnemonics, vec!["gh", "github"]);

        let by_uuid = store.find_credential(&created.uuid).unwrap();
        assert_eq!(by_uuid.id, created.id);

        assert!(matches!(
            store.find_credential("missing"),
            Err(VaultSafeError::CredentialNotFound(_))
        ));
    }

    #[test]
    fn duplicate_mnemonic_rolls_back_credential() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();

        let err = store
            .create_credential("GitLab", &github(), &names(&["gl", "gh"]), &key)
            .unwrap_err();
        assert!(matches!(err, VaultSafeError::DuplicateMnemonic(ref m) if m == "gh"));
        assert_eq!(store.credential_count().unwrap(), 1);
        assert!(store.find_credential("gl").is_err());
    }

    #[test]
    fn mnemonic_batch_rejects_repeats_and_blanks() {
        let (mut store, key) = store_with_vault();
        let err = store
            .create_credential("A", &github(), &names(&["a", "a"]), &key)
            .unwrap_err();
        assert!(matches!(err, VaultSafeError::DuplicateMnemonic(_)));

        let err = store
            .create_credential("B", &github(), &names(&["  "]), &key)
            .unwrap_err();
        assert!(matches!(err, VaultSafeError::InvalidMnemonic(_)));
        assert_eq!(store.credential_count().unwrap(), 0);
    }

    #[test]
    fn register_mnemonics_on_existing_credential() {
        let (mut store, key) = store_with_vault();
        let created = store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
        store
            .register_mnemonics(&names(&["hub"]), created.id)
            .unwrap();
        assert_eq!(store.find_credential("hub").unwrap().mnemonics, vec!["gh", "hub"]);
        assert!(matches!(
            store.register_mnemonics(&names(&["hub"]), created.id),
            Err(VaultSafeError::DuplicateMnemonic(_))
        ));
    }

    #[test]
    fn read_credential_reveals_fields() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
        let plain = store.read_credential("gh", &key).unwrap();
        assert_eq!(plain.field(CredentialField::Password).as_option(), Some("p@ss"));
        assert_eq!(plain.field(CredentialField::Token), &FieldValue::NotProvided);
    }

    #[test]
    fn update_changes_fields_and_keeps_key() {
        let (mut store, key) = store_with_vault();
        let created = store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();

        let mut update = CredentialUpdate {
            name: Some("GitHub Work".into()),
            add_mnemonics: names(&["ghw"]),
            ..Default::default()
        };
        update.fields.insert(CredentialField::Password, Some("n3w".into()));
        update.fields.insert(CredentialField::Username, None);
        store.update_credential_fields("gh", &update, &key).unwrap();

        let stored = store.find_credential("ghw").unwrap();
        assert_eq!(stored.encrypted_key, created.encrypted_key);
        assert_eq!(stored.name, "GitHub Work");
        assert_eq!(stored.field_state(CredentialField::Username), &FieldState::Absent);
        let plain = stored.to_plaintext(&key).unwrap();
        assert_eq!(plain.field(CredentialField::Password).as_option(), Some("n3w"));
    }

    #[test]
    fn failed_update_leaves_row_untouched() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
        store
            .create_credential("Mail", &CredentialFields::default(), &names(&["mail"]), &key)
            .unwrap();

        let update = CredentialUpdate {
            name: Some("Renamed".into()),
            add_mnemonics: names(&["mail"]),
            ..Default::default()
        };
        assert!(store.update_credential_fields("gh", &update, &key).is_err());
        assert_eq!(store.find_credential("gh").unwrap().name, "GitHub");
    }

    #[test]
    fn search_matches_names_and_mnemonics() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
        store
            .create_credential("Bank", &CredentialFields::default(), &names(&["money"]), &key)
            .unwrap();

        let hits = store.search_credentials("GIT").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "GitHub");
        assert_eq!(store.search_credentials("mon").unwrap()[0].name, "Bank");
        // Secret values are not searchable.
        assert!(store.search_credentials("alice").unwrap().is_empty());
    }

    #[test]
    fn delete_cascades_mnemonics() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh", "hub"]), &key)
            .unwrap();
        store.delete_credential("hub").unwrap();
        assert_eq!(store.credential_count().unwrap(), 0);
        assert_eq!(store.mnemonic_count().unwrap(), 0);

        // The names are free again.
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
    }

    #[test]
    fn foreign_vault_key_is_rejected() {
        let (mut store, _) = store_with_vault();
        let other = crate::crypto::keys::derive_vault_key_with_params("other", &params()).unwrap();
        assert!(matches!(
            store.create_credential("X", &github(), &[], &other),
            Err(VaultSafeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn rotation_rewraps_every_credential() {
        let (mut store, old_key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &old_key)
            .unwrap();
        store
            .create_credential("Mail", &CredentialFields::default(), &names(&["mail"]), &old_key)
            .unwrap();

        store.rotate_master_password(PW, "N3wPass!").unwrap();

        assert!(matches!(store.unlock(PW), Err(VaultSafeError::AuthenticationFailed)));
        let new_key = store.unlock("N3wPass!").unwrap();
        let plain = store.read_credential("gh", &new_key).unwrap();
        assert_eq!(plain.field(CredentialField::Password).as_option(), Some("p@ss"));
        assert!(matches!(
            store.read_credential("gh", &old_key),
            Err(VaultSafeError::DecryptionFailed)
        ));
    }

    #[test]
    fn rotation_with_wrong_password_changes_nothing() {
        let (mut store, _) = store_with_vault();
        let before = store.vault().unwrap();
        assert!(matches!(
            store.rotate_master_password("wrong", "N3wPass!"),
            Err(VaultSafeError::AuthenticationFailed)
        ));
        assert_eq!(store.vault().unwrap().master_password_hash, before.master_password_hash);
    }

    #[test]
    fn rotation_failure_rolls_back() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();
        store
            .conn
            .execute("UPDATE credential SET encrypted_key = 'garbage'", [])
            .unwrap();
        let before = store.vault().unwrap();

        let err = store.rotate_master_password(PW, "N3wPass!").unwrap_err();
        assert!(matches!(err, VaultSafeError::RotationFailed(_)));
        assert_eq!(store.vault().unwrap().password_salt, before.password_salt);
        assert!(store.unlock(PW).is_ok());
    }

    #[test]
    fn update_vault_metadata() {
        let (mut store, _) = store_with_vault();
        let update = VaultUpdate {
            name: Some("work".into()),
            session_check: Some(false),
            session_expiration: Some(60),
            ..Default::default()
        };
        let vault = store.update_vault(&update).unwrap();
        assert_eq!(vault.name, "work");
        let loaded = store.vault().unwrap();
        assert!(!loaded.session_check);
        assert_eq!(loaded.session_expiration, 60);

        let bad = VaultUpdate {
            session_expiration: Some(0),
            ..Default::default()
        };
        assert!(store.update_vault(&bad).is_err());
    }

    #[test]
    fn import_skips_bad_records_only() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("GitHub", &github(), &names(&["gh"]), &key)
            .unwrap();

        let records = vec![
            CredentialImport {
                name: "Dup".into(),
                fields: github(),
                mnemonics: names(&["gh"]),
            },
            CredentialImport {
                name: "Mail".into(),
                fields: CredentialFields {
                    primary_email: Some("a@b.c".into()),
                    ..Default::default()
                },
                mnemonics: names(&["mail"]),
            },
            CredentialImport {
                name: "".into(),
                ..Default::default()
            },
        ];
        let report = store.import_credentials(records, &key).unwrap();
        assert_eq!(report.imported, vec!["Mail"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(store.credential_count().unwrap(), 2);
    }

    #[test]
    fn export_decrypts_everything() {
        let (mut store, key) = store_with_vault();
        store
            .create_credential("b-site", &github(), &names(&["b"]), &key)
            .unwrap();
        store
            .create_credential("A-site", &CredentialFields::default(), &[], &key)
            .unwrap();
        let exported = store.export_credentials(&key).unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].name, "A-site");
        assert_eq!(exported[1].field(CredentialField::Username).as_option(), Some("alice"));
    }

    #[test]
    fn open_on_disk_and_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let db = data_dir.join(DB_FILE_NAME);
        {
            let mut store = VaultStore::open(&db).unwrap();
            store
                .initialize_vault(PW, &VaultProfile::default(), &params())
                .unwrap();
        }
        let reopened = VaultStore::open(&db).unwrap();
        assert!(reopened.is_initialized().unwrap());
        drop(reopened);

        VaultStore::destroy(&data_dir).unwrap();
        assert!(!data_dir.exists());
    }
}
