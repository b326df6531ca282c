//! `vaultsafe update`: change a credential in place.
//!
//! Fields given as flags are re-encrypted under the credential's existing
//! key, `--clear` resets fields to "Not Provided", and new mnemonics are
//! attached. Everything happens in one transaction.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, unlock_store, Cli, FieldArgs};
use crate::errors::{Result, VaultSafeError};
use crate::vault::{CredentialField, CredentialUpdate};

/// Execute the `update` command.
pub fn execute(
    cli: &Cli,
    identifier: &str,
    name: Option<&str>,
    add_mnemonics: &[String],
    clear: &[CredentialField],
    field_args: FieldArgs,
) -> Result<()> {
    let update = build_update(name, add_mnemonics, clear, field_args)?;
    if update.is_empty() {
        output::info("Nothing to update.");
        output::tip("Pass field flags such as --password, --clear <FIELD> or --add-mnemonic.");
        return Ok(());
    }

    let data_dir = data_dir(cli)?;
    let (mut store, vault_key) = unlock_store(&data_dir)?;
    let credential = store.update_credential_fields(identifier, &update, &vault_key)?;

    let changed: Vec<&str> = update.fields.keys().map(|f| f.as_str()).collect();
    let details = changed.join(",");
    log_audit(
        &data_dir,
        "update",
        Some(identifier),
        (!details.is_empty()).then_some(details.as_str()),
    );

    output::success(&format!("Credential '{}' updated", credential.name));
    Ok(())
}

fn build_update(
    name: Option<&str>,
    add_mnemonics: &[String],
    clear: &[CredentialField],
    field_args: FieldArgs,
) -> Result<CredentialUpdate> {
    let mut update = CredentialUpdate {
        name: name.map(str::to_string),
        add_mnemonics: add_mnemonics.to_vec(),
        ..Default::default()
    };

    for (field, value) in field_args.into_fields().iter() {
        if let Some(value) = value {
            update.fields.insert(field, Some(value.clone()));
        }
    }

    for field in clear {
        if update.fields.insert(*field, None).is_some() {
            return Err(VaultSafeError::CommandFailed(format!(
                "cannot both set and clear {field}"
            )));
        }
    }

    Ok(update)
}
