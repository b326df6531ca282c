//! Random password and salt generation.

use rand::Rng;

use crate::errors::{Result, VaultSafeError};

/// Alphabet for generated passwords and salts.
pub const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@#$-%&";

/// Shortest password `generate_strong_password` will produce.
pub const MIN_GENERATED_LEN: usize = 4;

/// Generate a random password of `length` characters from
/// `PASSWORD_ALPHABET`.
pub fn generate_strong_password(length: usize) -> Result<String> {
    if length < MIN_GENERATED_LEN {
        return Err(VaultSafeError::CommandFailed(format!(
            "password length must be at least {MIN_GENERATED_LEN} characters"
        )));
    }

    let mut rng = rand::rng();
    Ok((0..length)
        .map(|_| char::from(PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())]))
        .collect())
}
