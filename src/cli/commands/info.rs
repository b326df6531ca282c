//! `vaultsafe info`: show the vault row and a list of credentials.
//!
//! Nothing is decrypted, so no password is needed.

use crate::cli::output;
use crate::cli::{data_dir, open_store, Cli};
use crate::errors::Result;

/// Execute the `info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let store = open_store(&data_dir)?;

    let vault = store.vault()?;
    output::print_vault_info(
        &vault,
        &data_dir,
        store.credential_count()?,
        store.mnemonic_count()?,
    );

    let credentials = store.list_credentials()?;
    output::print_credentials_table(&credentials);

    Ok(())
}
