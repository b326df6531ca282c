//! `vaultsafe init`: create the vault and its master password.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{confirm, data_dir, is_interactive, prompt_new_password, Cli, PASSWORD_ENV_VAR};
use crate::config::Settings;
use crate::errors::{Result, VaultSafeError};
use crate::vault::{VaultProfile, VaultStore, VaultUpdate};

/// Execute the `init` command.
pub fn execute(
    cli: &Cli,
    name: Option<&str>,
    owner: Option<&str>,
    email: Option<&str>,
    force: bool,
) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let db_path = Settings::db_path(&data_dir);
    let settings = Settings::load(&data_dir)?;

    // 1. Refuse to overwrite an existing vault unless --force was given.
    if db_path.exists() && VaultStore::open(&db_path)?.is_initialized()? {
        if !force {
            output::tip("Use `vaultsafe init --force` to destroy it and start over.");
            return Err(VaultSafeError::VaultAlreadyExists(db_path));
        }
        if is_interactive()
            && !confirm("This permanently deletes every stored credential. Continue?")?
        {
            return Err(VaultSafeError::UserCancelled);
        }
        VaultStore::destroy(&data_dir)?;
        output::warning(&format!("Destroyed the vault at {}", data_dir.display()));
    }

    // 2. Prompt for the master password (twice).
    let password = prompt_new_password(PASSWORD_ENV_VAR)?;

    // 3. Create the vault row with the configured KDF and session policy.
    let mut store = VaultStore::open(&db_path)?;
    let profile = VaultProfile {
        name: name.map(str::to_string),
        owner_name: owner.map(str::to_string),
        owner_email: email.map(str::to_string),
    };
    store.initialize_vault(&password, &profile, &settings.kdf_params())?;
    let vault = store.update_vault(&VaultUpdate {
        session_check: Some(settings.session_check),
        session_expiration: Some(settings.session_expiration),
        ..Default::default()
    })?;

    log_audit(&data_dir, "init", None, Some("vault created"));

    output::success(&format!(
        "Vault '{}' created at {}",
        vault.name,
        data_dir.display()
    ));
    output::tip("Run `vaultsafe add <NAME> -m <MNEMONIC>` to store a credential.");
    output::tip("Run `vaultsafe info` to see the vault details.");

    Ok(())
}
