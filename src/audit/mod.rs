//! Audit log: SQLite-backed history of vault operations.
//!
//! Every command that reads or changes the vault appends a row to
//! `<data_dir>/audit.db`. Only operation names, credential identifiers
//! and short details are stored, never secret values.
//!
//! Logging is best effort: if the database can't be opened or written
//! to, the command carries on without it.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::errors::{Result, VaultSafeError};

/// File name of the audit database inside the data directory.
pub const AUDIT_FILE_NAME: &str = "audit.db";

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    /// Credential mnemonic / uuid the operation was about, if any.
    pub target: Option<String>,
    pub details: Option<String>,
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `<data_dir>/audit.db`.
    ///
    /// Returns `None` if the database can't be opened; callers treat
    /// that as "audit logging unavailable".
    pub fn open(data_dir: &Path) -> Option<Self> {
        let db_path = Self::db_path(data_dir);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                operation   TEXT NOT NULL,
                target      TEXT,
                details     TEXT
            );",
        )
        .ok()?;

        Some(Self { conn })
    }

    /// Record an operation. Errors are ignored.
    pub fn log(&self, operation: &str, target: Option<&str>, details: Option<&str>) {
        let now = Utc::now().to_rfc3339();
        if let Err(e) = self.conn.execute(
            "INSERT INTO audit_log (timestamp, operation, target, details)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![now, operation, target, details],
        ) {
            debug!(error = %e, operation, "audit write failed");
        }
    }

    /// Most recent entries first, at most `limit`, optionally only those
    /// at or after `since`.
    pub fn query(&self, limit: usize, since: Option<DateTime<Utc>>) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let since_str = since.map(|ts| ts.to_rfc3339());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, operation, target, details
                 FROM audit_log
                 WHERE ?1 IS NULL OR timestamp >= ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )
            .map_err(|e| VaultSafeError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![since_str, limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    target: row.get(3)?,
                    details: row.get(4)?,
                })
            })
            .map_err(|e| VaultSafeError::AuditError(format!("query exec: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| VaultSafeError::AuditError(format!("row parse: {e}")))?);
        }

        Ok(entries)
    }

    /// Path of the audit database for a data directory.
    pub fn db_path(data_dir: &Path) -> PathBuf {
        data_dir.join(AUDIT_FILE_NAME)
    }
}

/// Open the audit log for `data_dir` and record one event, ignoring any
/// failure. Safe to call from any command.
pub fn log_audit(data_dir: &Path, op: &str, target: Option<&str>, details: Option<&str>) {
    if let Some(audit) = AuditLog::open(data_dir) {
        audit.log(op, target, details);
    }
}
