//! CLI module: Clap argument parser, prompts, output helpers, and command
//! implementations.

pub mod commands;
pub mod output;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::{Args, Parser};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::settings::resolve_data_dir;
use crate::config::Settings;
use crate::crypto::keys::VaultKey;
use crate::errors::{Result, VaultSafeError};
use crate::session::SessionFile;
use crate::vault::{CredentialField, CredentialFields, VaultRecord, VaultStore};

/// Minimum master password length to prevent trivially weak passwords.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Master password for scripted use.
pub const PASSWORD_ENV_VAR: &str = "VAULTSAFE_PASSWORD";

/// New master password for scripted `change-master-password`.
pub const NEW_PASSWORD_ENV_VAR: &str = "VAULTSAFE_NEW_PASSWORD";

/// VaultSafe CLI: local credential vault.
#[derive(Parser)]
#[command(name = "vaultsafe", about = "Local encrypted credential vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Data directory (default: $VAULTSAFE_HOME or ~/.vaultsafe)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault protected by a master password
    Init {
        /// Vault name (default: host name)
        #[arg(long)]
        name: Option<String>,
        /// Owner name (default: current user)
        #[arg(long)]
        owner: Option<String>,
        /// Owner email
        #[arg(long)]
        email: Option<String>,
        /// Destroy an existing vault and start over
        #[arg(long)]
        force: bool,
    },

    /// Show vault details and stored credentials
    Info,

    /// Add a credential
    Add {
        /// Credential name (e.g. GitHub)
        name: String,
        /// Mnemonics for the credential (comma separated or repeated)
        #[arg(short, long = "mnemonic", value_delimiter = ',')]
        mnemonics: Vec<String>,
        /// Generate a strong password instead of providing one
        #[arg(short, long)]
        generate: bool,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Show a credential, matching credentials, or every credential
    Get {
        /// Mnemonic or uuid (omit to show all)
        identifier: Option<String>,
        /// Case-insensitive search over names and mnemonics
        #[arg(short, long, conflicts_with = "identifier")]
        search: Option<String>,
        /// Print only this field's value
        #[arg(short, long, requires = "identifier")]
        field: Option<CredentialField>,
    },

    /// Copy a credential field to the clipboard
    Copy {
        /// Mnemonic or uuid
        identifier: String,
        /// Field to copy (default: password)
        #[arg(short, long, default_value = "password")]
        field: CredentialField,
    },

    /// Update a credential's name, fields or mnemonics
    Update {
        /// Mnemonic or uuid
        identifier: String,
        /// New credential name
        #[arg(long)]
        name: Option<String>,
        /// Mnemonics to add
        #[arg(short = 'm', long = "add-mnemonic", value_delimiter = ',')]
        add_mnemonics: Vec<String>,
        /// Fields to clear back to "Not Provided"
        #[arg(long = "clear", value_delimiter = ',')]
        clear: Vec<CredentialField>,
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Delete a credential and its mnemonics
    Del {
        /// Mnemonic or uuid
        identifier: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the master password
    ChangeMasterPassword,

    /// Edit vault metadata and session policy
    UpdateVault {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Reuse a session instead of prompting every time
        #[arg(long)]
        session_check: Option<bool>,
        /// Session lifetime in seconds
        #[arg(long)]
        session_expiration: Option<u64>,
    },

    /// Generate a strong random password
    Generate {
        /// Password length (default from config)
        #[arg(short, long)]
        length: Option<usize>,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        copy: bool,
    },

    /// Export decrypted credentials as JSON
    Export {
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import credentials from a JSON or CSV file
    Import {
        /// Path to the file to import
        file: PathBuf,
        /// Import format: json or csv (auto-detected from extension)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Forget the current session
    Logout,

    /// View the audit log of vault operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },
}

/// Per-field values shared by `add` and `update`.
#[derive(Args, Debug, Default, Clone)]
pub struct FieldArgs {
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub recovery_key: Option<String>,
    #[arg(long)]
    pub primary_email: Option<String>,
    #[arg(long)]
    pub secondary_email: Option<String>,
    #[arg(long)]
    pub token: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

impl FieldArgs {
    pub fn into_fields(self) -> CredentialFields {
        CredentialFields {
            url: self.url,
            username: self.username,
            password: self.password,
            recovery_key: self.recovery_key,
            primary_email: self.primary_email,
            secondary_email: self.secondary_email,
            token: self.token,
            notes: self.notes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clone().into_fields().iter().all(|(_, v)| v.is_none())
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Data directory for this invocation.
pub fn data_dir(cli: &Cli) -> Result<PathBuf> {
    resolve_data_dir(cli.data_dir.as_deref())
}

/// Open the vault database of an initialized vault.
pub fn open_store(data_dir: &Path) -> Result<VaultStore> {
    let db_path = Settings::db_path(data_dir);
    if !db_path.exists() {
        output::tip("Run `vaultsafe init` to create a vault.");
        return Err(VaultSafeError::VaultNotInitialized);
    }
    let store = VaultStore::open(&db_path)?;
    if !store.is_initialized()? {
        output::tip("Run `vaultsafe init` to create a vault.");
        return Err(VaultSafeError::VaultNotInitialized);
    }
    Ok(store)
}

/// Open the vault and unlock it, reusing a live session when allowed.
pub fn unlock_store(data_dir: &Path) -> Result<(VaultStore, VaultKey)> {
    let store = open_store(data_dir)?;
    let vault = store.vault()?;
    let password = resolve_master_password(data_dir, &vault)?;
    let vault_key = store.unlock(&password)?;
    Ok((store, vault_key))
}

/// The master password for this command.
///
/// With session checks on, a valid unexpired token in `<data_dir>/.session`
/// supplies it. Otherwise the password is read (env var or prompt),
/// verified, and a fresh token is saved.
pub fn resolve_master_password(data_dir: &Path, vault: &VaultRecord) -> Result<Zeroizing<String>> {
    let session = SessionFile::new(Settings::session_path(data_dir));

    if vault.session_check {
        if let Some(token) = session.load()? {
            let signer = vault.session_signer();
            match signer.verify(&token, vault.session_expiration) {
                Some(password) if vault.check_password(&password) => {
                    debug!("master password taken from session");
                    return Ok(password);
                }
                Some(_) => warn!("session holds a stale master password"),
                None => debug!("session token rejected"),
            }
            session.clear()?;
        }
    }

    let password = prompt_password("Enter master password")?;
    if !vault.check_password(&password) {
        return Err(VaultSafeError::AuthenticationFailed);
    }

    if vault.session_check {
        let token = vault.session_signer().issue(&password)?;
        session.save(&token)?;
        debug!(path = %session.path().display(), "session saved");
    }

    Ok(password)
}

/// Read the master password from `VAULTSAFE_PASSWORD` or an interactive
/// prompt.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV_VAR) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultSafeError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt twice for a new master password.
///
/// `env_var` supplies it for scripted use. A mismatch between the two
/// entries fails with `PasswordMismatch`; the length rule applies either
/// way.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            validate_new_password(&pw)?;
            return Ok(Zeroizing::new(pw));
        }
    }

    let first = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Choose master password")
            .interact()
            .map_err(|e| VaultSafeError::CommandFailed(format!("password prompt: {e}")))?,
    );
    validate_new_password(&first)?;

    let second = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Confirm master password")
            .interact()
            .map_err(|e| VaultSafeError::CommandFailed(format!("password prompt: {e}")))?,
    );

    if *first != *second {
        return Err(VaultSafeError::PasswordMismatch);
    }
    Ok(first)
}

fn validate_new_password(pw: &str) -> Result<()> {
    if pw.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultSafeError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// True when prompts can be shown.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Ask for a yes/no confirmation.
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultSafeError::CommandFailed(format!("confirm prompt: {e}")))
}
