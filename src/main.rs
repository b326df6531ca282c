use clap::Parser;
use tracing_subscriber::EnvFilter;
use vaultsafe::cli::commands;
use vaultsafe::cli::{Cli, Commands};
use vaultsafe::vault::VaultUpdate;

/// Environment variable holding the diagnostic log filter.
const LOG_ENV_VAR: &str = "VAULTSAFE_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            ref name,
            ref owner,
            ref email,
            force,
        } => commands::init::execute(
            &cli,
            name.as_deref(),
            owner.as_deref(),
            email.as_deref(),
            force,
        ),
        Commands::Info => commands::info::execute(&cli),
        Commands::Add {
            ref name,
            ref mnemonics,
            generate,
            ref fields,
        } => commands::add::execute(&cli, name, mnemonics, generate, fields.clone()),
        Commands::Get {
            ref identifier,
            ref search,
            field,
        } => commands::get::execute(&cli, identifier.as_deref(), search.as_deref(), field),
        Commands::Copy {
            ref identifier,
            field,
        } => commands::copy::execute(&cli, identifier, field),
        Commands::Update {
            ref identifier,
            ref name,
            ref add_mnemonics,
            ref clear,
            ref fields,
        } => commands::update::execute(
            &cli,
            identifier,
            name.as_deref(),
            add_mnemonics,
            clear,
            fields.clone(),
        ),
        Commands::Del {
            ref identifier,
            force,
        } => commands::delete::execute(&cli, identifier, force),
        Commands::ChangeMasterPassword => commands::change_master_password::execute(&cli),
        Commands::UpdateVault {
            ref name,
            ref owner,
            ref email,
            session_check,
            session_expiration,
        } => commands::update_vault::execute(
            &cli,
            VaultUpdate {
                name: name.clone(),
                owner_name: owner.clone(),
                owner_email: email.clone(),
                session_check,
                session_expiration,
            },
        ),
        Commands::Generate { length, copy } => commands::generate::execute(&cli, length, copy),
        Commands::Export { ref output } => commands::export::execute(&cli, output.as_deref()),
        Commands::Import {
            ref file,
            ref format,
        } => commands::import_cmd::execute(&cli, file, format.as_deref()),
        Commands::Logout => commands::logout::execute(&cli),
        Commands::Audit { last, ref since } => {
            commands::audit_cmd::execute(&cli, last, since.as_deref())
        }
    };

    if let Err(e) = result {
        vaultsafe::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr, filtered by `VAULTSAFE_LOG` (default: warn).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
