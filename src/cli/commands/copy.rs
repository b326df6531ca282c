//! `vaultsafe copy`: put one decrypted field on the clipboard.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, unlock_store, Cli};
use crate::errors::{Result, VaultSafeError};
use crate::vault::{CredentialField, FieldValue};

/// Execute the `copy` command.
pub fn execute(cli: &Cli, identifier: &str, field: CredentialField) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let (store, vault_key) = unlock_store(&data_dir)?;

    let credential = store.find_credential(identifier)?;
    let value = match credential.reveal_field(field, &vault_key)? {
        FieldValue::Value(value) => value,
        FieldValue::NotProvided => {
            return Err(VaultSafeError::CommandFailed(format!(
                "'{}' has no {} stored",
                credential.name,
                field.label().to_lowercase()
            )));
        }
    };

    copy_to_clipboard(&value)?;

    log_audit(&data_dir, "copy", Some(identifier), Some(field.as_str()));
    output::success(&format!(
        "{} of '{}' copied to the clipboard",
        field.label(),
        credential.name
    ));
    Ok(())
}

/// Copy `text` to the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| VaultSafeError::ClipboardError(e.to_string()))?;
    clipboard
        .set_text(text.to_owned())
        .map_err(|e| VaultSafeError::ClipboardError(e.to_string()))
}
