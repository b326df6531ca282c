//! `vaultsafe audit`: show recent vault activity.
//!
//!   vaultsafe audit                 # last 50 events
//!   vaultsafe audit --last 10
//!   vaultsafe audit --since 2w      # s, m, h, d and w are accepted

use chrono::{DateTime, Duration, Utc};

use crate::audit::AuditLog;
use crate::cli::output;
use crate::cli::{data_dir, Cli};
use crate::errors::{Result, VaultSafeError};

/// Execute the `audit` command.
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    let cutoff = since.map(cutoff_from_age).transpose()?;

    let data_dir = data_dir(cli)?;
    let log = if AuditLog::db_path(&data_dir).exists() {
        AuditLog::open(&data_dir)
    } else {
        None
    };
    let Some(log) = log else {
        output::info("No vault activity recorded yet.");
        return Ok(());
    };

    let entries = log.query(last, cutoff)?;
    if entries.is_empty() {
        output::info("No vault activity in the selected window.");
        return Ok(());
    }

    output::print_audit_entries(&entries);
    Ok(())
}

/// Turn an age such as `90m` or `2w` into the oldest timestamp to show.
fn cutoff_from_age(age: &str) -> Result<DateTime<Utc>> {
    let age = age.trim();
    let invalid = || {
        VaultSafeError::CommandFailed(format!(
            "invalid age '{age}', expected a number followed by s, m, h, d or w"
        ))
    };

    let unit = age.chars().last().ok_or_else(invalid)?;
    let amount: i64 = age[..age.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    let window = match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    Utc::now().checked_sub_signed(window).ok_or_else(invalid)
}
