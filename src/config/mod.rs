//! Configuration: `vaultsafe.toml` settings and data-directory layout.

pub mod settings;

pub use settings::Settings;
