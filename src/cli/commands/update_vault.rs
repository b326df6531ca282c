//! `vaultsafe update-vault`: edit vault metadata and session policy.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, open_store, resolve_master_password, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::session::SessionFile;
use crate::vault::VaultUpdate;

/// Execute the `update-vault` command.
pub fn execute(cli: &Cli, update: VaultUpdate) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let mut store = open_store(&data_dir)?;

    let vault = store.vault()?;
    resolve_master_password(&data_dir, &vault)?;

    let updated = store.update_vault(&update)?;

    // Turning sessions off should not leave a usable token behind.
    if !updated.session_check {
        SessionFile::new(Settings::session_path(&data_dir)).clear()?;
    }

    log_audit(&data_dir, "update-vault", None, None);
    output::success("Vault information updated");
    output::print_vault_info(
        &updated,
        &data_dir,
        store.credential_count()?,
        store.mnemonic_count()?,
    );

    Ok(())
}
