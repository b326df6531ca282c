//! `vaultsafe export`: write every credential, decrypted, as JSON.
//!
//! The output is plaintext. It can be read back with `vaultsafe import`.

use std::path::Path;

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, unlock_store, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultSafeError};
use crate::session::write_private;
use crate::vault::ExportDocument;

/// Execute the `export` command.
pub fn execute(cli: &Cli, output_path: Option<&Path>) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let (store, vault_key) = unlock_store(&data_dir)?;

    let credentials = store.export_credentials(&vault_key)?;
    let count = credentials.len();
    let content = ExportDocument::new(credentials).to_json()?;

    log_audit(
        &data_dir,
        "export",
        None,
        Some(&format!("{count} credentials")),
    );

    match output_path {
        Some(dest) => {
            // Refuse to overwrite the vault database itself.
            if dest == Settings::db_path(&data_dir) {
                return Err(VaultSafeError::CommandFailed(
                    "refusing to export over the vault database".into(),
                ));
            }

            write_private(dest, content.as_bytes()).map_err(|e| {
                VaultSafeError::CommandFailed(format!(
                    "failed to write export file {}: {e}",
                    dest.display()
                ))
            })?;

            output::success(&format!("Exported {count} credentials to {}", dest.display()));
            output::warning("The export file is not encrypted. Store or delete it carefully.");
        }
        None => {
            // Write to stdout (no success message, just raw output).
            println!("{content}");
        }
    }

    Ok(())
}
