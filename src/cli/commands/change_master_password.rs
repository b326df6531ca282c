//! `vaultsafe change-master-password`: rotate the master password.
//!
//! Only the credential keys are re-wrapped under the new vault key; field
//! ciphertext is left alone. The current session is dropped because it
//! carries the old password.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, open_store, prompt_new_password, prompt_password, Cli, NEW_PASSWORD_ENV_VAR};
use crate::config::Settings;
use crate::errors::{Result, VaultSafeError};
use crate::session::SessionFile;

/// Execute the `change-master-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let mut store = open_store(&data_dir)?;

    // 1. The current password is always asked for, never taken from a session.
    output::info("Enter your current master password.");
    let old_password = prompt_password("Current master password")?;
    if !store.verify_master_password(&old_password)? {
        return Err(VaultSafeError::AuthenticationFailed);
    }

    // 2. New password, twice.
    output::info("Choose your new master password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV_VAR)?;

    // 3. Re-wrap every credential key in one transaction.
    store.rotate_master_password(&old_password, &new_password)?;
    let count = store.credential_count()?;

    SessionFile::new(Settings::session_path(&data_dir)).clear()?;

    log_audit(
        &data_dir,
        "change-master-password",
        None,
        Some(&format!("{count} credential keys re-wrapped")),
    );
    output::success(&format!(
        "Master password changed ({count} credential keys re-wrapped)"
    ));

    Ok(())
}
