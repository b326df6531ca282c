//! One module per `vaultsafe` subcommand.

pub mod add;
pub mod audit_cmd;
pub mod change_master_password;
pub mod copy;
pub mod delete;
pub mod export;
pub mod generate;
pub mod get;
pub mod import_cmd;
pub mod info;
pub mod init;
pub mod logout;
pub mod update;
pub mod update_vault;
