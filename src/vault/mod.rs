//! Vault module: the vault record, credentials and their SQLite store.
//!
//! - `VaultRecord` holds the password verifier and session material (`record`)
//! - `Credential` encrypts fields under its own wrapped key (`credential`)
//! - `VaultStore` is the database handle every command goes through (`store`)
//! - JSON / CSV import and export documents (`transfer`)

pub mod credential;
pub mod fields;
pub mod record;
pub mod store;
pub mod transfer;

// Re-export the most commonly used items.
pub use credential::{Credential, PlaintextCredential};
pub use fields::{CredentialField, CredentialFields, FieldState, FieldValue, NOT_PROVIDED};
pub use record::{VaultProfile, VaultRecord, VaultUpdate};
pub use store::{CredentialUpdate, VaultStore};
pub use transfer::{CredentialImport, ExportDocument, ImportReport};
