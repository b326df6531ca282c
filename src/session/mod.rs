//! Session tokens: skip the master-password prompt for a bounded time.
//!
//! The token embeds the raw master password, so reading the session file
//! is equivalent to knowing the password until the token expires.

pub mod file;
pub mod token;

pub use file::{write_private, SessionFile};
pub use token::SessionSigner;
