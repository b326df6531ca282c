//! `vaultsafe logout`: forget the saved session.

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::session::SessionFile;

/// Execute the `logout` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let data_dir = data_dir(cli)?;
    let session = SessionFile::new(Settings::session_path(&data_dir));

    if session.load()?.is_none() {
        output::info("No active session.");
        return Ok(());
    }

    session.clear()?;
    log_audit(&data_dir, "logout", None, None);
    output::success("Session cleared; the master password will be asked for again.");
    Ok(())
}
