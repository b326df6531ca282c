//! `vaultsafe generate`: print or copy a strong random password.
//!
//! Does not touch the vault.

use crate::cli::commands::copy::copy_to_clipboard;
use crate::cli::output;
use crate::cli::{data_dir, Cli};
use crate::config::Settings;
use crate::crypto::password::generate_strong_password;
use crate::errors::Result;

/// Execute the `generate` command.
pub fn execute(cli: &Cli, length: Option<usize>, copy: bool) -> Result<()> {
    let length = match length {
        Some(length) => length,
        None => Settings::load(&data_dir(cli)?)?.generated_password_length,
    };

    let password = generate_strong_password(length)?;

    if copy {
        copy_to_clipboard(&password)?;
        output::success(&format!("{length}-character password copied to the clipboard"));
    } else {
        println!("{password}");
    }

    Ok(())
}
