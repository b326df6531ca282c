//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::audit::AuditEntry;
use crate::vault::{Credential, CredentialField, PlaintextCredential, VaultRecord};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print one decrypted credential as a two-column table.
///
/// `index` numbers the credential when several are printed in a row.
pub fn print_credential(credential: &PlaintextCredential, index: Option<usize>) {
    let title = match index {
        Some(i) => format!("{i}. {}", credential.name),
        None => credential.name.clone(),
    };
    println!("{}", style(title).bold().cyan());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    let mnemonics = if credential.mnemonics.is_empty() {
        "-".to_string()
    } else {
        credential.mnemonics.join(", ")
    };
    table.add_row(vec!["Mnemonics".to_string(), mnemonics]);

    for field in CredentialField::ALL {
        let value = credential.field(field);
        let shown = if value.is_provided() {
            value.to_string()
        } else {
            style(value.to_string()).dim().to_string()
        };
        table.add_row(vec![field.label().to_string(), shown]);
    }

    table.add_row(vec!["UUID".to_string(), credential.uuid.clone()]);
    table.add_row(vec![
        "Created".to_string(),
        credential.date_created.format(TIME_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        credential.last_updated.format(TIME_FORMAT).to_string(),
    ]);

    println!("{table}");
}

/// Print a table of stored credentials without decrypting anything.
pub fn print_credentials_table(credentials: &[Credential]) {
    if credentials.is_empty() {
        info("No credentials in this vault yet.");
        tip("Run `vaultsafe add <NAME> -m <MNEMONIC>` to add your first credential.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Mnemonics", "Fields", "Updated"]);

    for c in credentials {
        let present = c
            .encrypted_fields()
            .iter()
            .filter(|(_, state)| state.is_present())
            .count();
        table.add_row(vec![
            c.name.clone(),
            c.mnemonics.join(", "),
            format!("{present}/{}", CredentialField::ALL.len()),
            c.last_updated.format(TIME_FORMAT).to_string(),
        ]);
    }

    println!("{table}");
}

/// Print the vault row and storage summary.
pub fn print_vault_info(
    vault: &VaultRecord,
    data_dir: &Path,
    credential_count: usize,
    mnemonic_count: usize,
) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let email = vault.owner_email.as_deref().unwrap_or("-");
    let session = if vault.session_check {
        format!("on, expires after {}s", vault.session_expiration)
    } else {
        "off".to_string()
    };

    let rows = [
        ("Vault", vault.name.clone()),
        ("Owner", vault.owner_name.clone()),
        ("Email", email.to_string()),
        ("UUID", vault.uuid.clone()),
        ("Location", data_dir.display().to_string()),
        ("Credentials", credential_count.to_string()),
        ("Mnemonics", mnemonic_count.to_string()),
        ("KDF iterations", vault.kdf_iterations.to_string()),
        ("Session", session),
        ("Created", vault.date_created.format(TIME_FORMAT).to_string()),
        ("Updated", vault.last_updated.format(TIME_FORMAT).to_string()),
    ];
    for (label, value) in rows {
        table.add_row(vec![label.to_string(), value]);
    }

    println!("{table}");
}

/// Print audit events, newest first, colouring the operation by kind.
pub fn print_audit_entries(entries: &[AuditEntry]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["When", "Operation", "Credential", "Details"]);

    for entry in entries {
        let operation = match entry.operation.as_str() {
            op @ ("init" | "add" | "import") => style(op).green(),
            op @ ("delete" | "change-master-password") => style(op).red(),
            op @ ("get" | "copy" | "export") => style(op).yellow(),
            op => style(op).cyan(),
        };
        table.add_row(vec![
            entry.timestamp.format(TIME_FORMAT).to_string(),
            operation.to_string(),
            entry.target.clone().unwrap_or_else(|| "-".into()),
            entry.details.clone().unwrap_or_else(|| "-".into()),
        ]);
    }

    println!("{}", style(format!("{} events", entries.len())).bold());
    println!("{table}");
}
