//! `vaultsafe add`: encrypt and store a new credential.
//!
//! Field values come from flags. When no field flag is given and stdin is
//! a terminal, each field is prompted for; an empty answer leaves the
//! field "Not Provided".

use dialoguer::{Input, Password};

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, is_interactive, unlock_store, Cli, FieldArgs};
use crate::config::Settings;
use crate::crypto::password::generate_strong_password;
use crate::errors::{Result, VaultSafeError};
use crate::vault::{CredentialField, CredentialFields};

/// Execute the `add` command.
pub fn execute(
    cli: &Cli,
    name: &str,
    mnemonics: &[String],
    generate: bool,
    field_args: FieldArgs,
) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let (mut store, vault_key) = unlock_store(&data_dir)?;

    let mut fields = if field_args.is_empty() && is_interactive() {
        prompt_fields(generate)?
    } else {
        field_args.into_fields()
    };

    if generate {
        if fields.password.is_some() {
            return Err(VaultSafeError::CommandFailed(
                "--generate cannot be combined with --password".into(),
            ));
        }
        let settings = Settings::load(&data_dir)?;
        fields.password = Some(generate_strong_password(settings.generated_password_length)?);
    }

    let credential = store.create_credential(name, &fields, mnemonics, &vault_key)?;

    let handle = credential
        .mnemonics
        .first()
        .map_or(credential.uuid.as_str(), String::as_str);
    log_audit(&data_dir, "add", Some(handle), Some(&credential.name));

    output::success(&format!("Credential '{}' added", credential.name));
    output::tip(&format!("Retrieve it with `vaultsafe get {handle}`"));

    Ok(())
}

/// Ask for every field interactively. Sensitive fields are read without
/// echo.
fn prompt_fields(skip_password: bool) -> Result<CredentialFields> {
    CredentialFields::try_from_fn(|field| {
        if skip_password && field == CredentialField::Password {
            return Ok(None);
        }
        let answer = if field.is_sensitive() {
            Password::new()
                .with_prompt(field.label())
                .allow_empty_password(true)
                .interact()
        } else {
            Input::<String>::new()
                .with_prompt(field.label())
                .allow_empty(true)
                .interact_text()
        }
        .map_err(|e| VaultSafeError::CommandFailed(format!("prompt: {e}")))?;

        Ok(if answer.is_empty() { None } else { Some(answer) })
    })
}
