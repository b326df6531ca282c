//! `vaultsafe import`: add credentials from a JSON or CSV file.
//!
//! Each record is imported on its own: a record whose mnemonic is already
//! taken (or whose name is empty) is skipped and reported, the rest go in.

use std::fs;
use std::path::Path;

use crate::audit::log_audit;
use crate::cli::output;
use crate::cli::{data_dir, unlock_store, Cli};
use crate::errors::{Result, VaultSafeError};
use crate::vault::transfer::{parse_csv, parse_json};

/// Execute the `import` command.
pub fn execute(cli: &Cli, source: &Path, format: Option<&str>) -> Result<()> {
    if !source.exists() {
        return Err(VaultSafeError::CommandFailed(format!(
            "import file not found: {}",
            source.display()
        )));
    }

    // Detect format from flag or file extension.
    let detected_format = match format {
        Some(f) => f.to_ascii_lowercase(),
        None => detect_format(source),
    };

    let records = match detected_format.as_str() {
        "json" => parse_json(&fs::read_to_string(source)?)?,
        "csv" => parse_csv(fs::File::open(source)?)?,
        other => {
            return Err(VaultSafeError::CommandFailed(format!(
                "unknown import format '{other}', use 'json' or 'csv'"
            )));
        }
    };

    if records.is_empty() {
        output::warning("No credentials found in the import file.");
        return Ok(());
    }

    let data_dir = data_dir(cli)?;
    let (mut store, vault_key) = unlock_store(&data_dir)?;
    let report = store.import_credentials(records, &vault_key)?;

    for name in &report.imported {
        output::info(&format!("  + {name}"));
    }
    for (name, reason) in &report.skipped {
        output::warning(&format!("Skipped '{name}': {reason}"));
    }

    log_audit(
        &data_dir,
        "import",
        None,
        Some(&format!(
            "{} imported, {} skipped from {}",
            report.imported.len(),
            report.skipped.len(),
            source.display()
        )),
    );

    output::success(&format!(
        "Imported {} credentials from {} ({} skipped)",
        report.imported.len(),
        source.display(),
        report.skipped.len()
    ));

    Ok(())
}

/// Guess the format from the file extension; JSON when unsure.
fn detect_format(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => "csv".to_string(),
        _ => "json".to_string(),
    }
}
