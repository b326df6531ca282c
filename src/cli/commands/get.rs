//! `vaultsafe get`: decrypt and show credentials.
//!
//! Usage:
//!   vaultsafe get gh                   # one credential
//!   vaultsafe get gh --field password  # raw value of one field
//!   vaultsafe get --search git         # credentials matching name/mnemonic
//!   vaultsafe get                      # everything

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, unlock_store, Cli};
use crate::errors::Result;
use crate::vault::CredentialField;

/// Execute the `get` command.
pub fn execute(
    cli: &Cli,
    identifier: Option<&str>,
    search: Option<&str>,
    field: Option<CredentialField>,
) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let (store, vault_key) = unlock_store(&data_dir)?;

    if let Some(identifier) = identifier {
        let credential = store.read_credential(identifier, &vault_key)?;
        match field {
            // Raw value on stdout so it can be piped.
            Some(field) => println!("{}", credential.field(field)),
            None => output::print_credential(&credential, None),
        }
        log_audit(
            &data_dir,
            "get",
            Some(identifier),
            field.map(CredentialField::as_str),
        );
        return Ok(());
    }

    let credentials = match search {
        Some(keyword) => store.search_credentials(keyword)?,
        None => store.list_credentials()?,
    };

    if credentials.is_empty() {
        match search {
            Some(keyword) => output::info(&format!("No credentials match '{keyword}'.")),
            None => output::info("No credentials found."),
        }
        return Ok(());
    }

    for (i, credential) in credentials.iter().enumerate() {
        let plain = credential.to_plaintext(&vault_key)?;
        println!();
        output::print_credential(&plain, Some(i + 1));
    }

    log_audit(
        &data_dir,
        "get",
        None,
        Some(&format!("{} credentials shown", credentials.len())),
    );
    Ok(())
}
