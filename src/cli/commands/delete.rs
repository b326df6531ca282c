//! `vaultsafe del`: remove a credential and its mnemonics.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{confirm, data_dir, is_interactive, unlock_store, Cli};
use crate::errors::Result;

/// Execute the `del` command.
pub fn execute(cli: &Cli, identifier: &str, force: bool) -> Result<()> {
    let data_dir = data_dir(cli)?;

    // Unlock first so a wrong password never reaches the confirmation.
    let (mut store, _vault_key) = unlock_store(&data_dir)?;
    let credential = store.find_credential(identifier)?;

    if !force && is_interactive() {
        let confirmed = confirm(&format!(
            "Delete credential '{}' ({})?",
            credential.name,
            credential.mnemonics.join(", ")
        ))?;
        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let deleted = store.delete_credential(identifier)?;

    log_audit(&data_dir, "delete", Some(identifier), Some(&deleted.name));
    output::success(&format!("Deleted credential '{}'", deleted.name));

    Ok(())
}
