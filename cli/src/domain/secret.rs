//! Credential generation from the operating system's CSPRNG.

use anyhow::{Context, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Default credential length.
pub const DEFAULT_SECRET_LENGTH: usize = 20;

/// Default alphabet: ASCII letters and digits.
pub const ALPHANUMERIC: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Length and alphabet of a generated credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub length: usize,
    pub alphabet: Vec<u8>,
}

impl Default for SecretSpec {
    fn default() -> Self {
        Self {
            length: DEFAULT_SECRET_LENGTH,
            alphabet: ALPHANUMERIC.as_bytes().to_vec(),
        }
    }
}

impl SecretSpec {
    #[must_use]
    pub fn new(length: usize, alphabet: &str) -> Self {
        Self {
            length,
            alphabet: alphabet.as_bytes().to_vec(),
        }
    }
}

/// Generate a random string of `spec.length` characters from `spec.alphabet`.
///
/// Bytes that would bias the modulo reduction are rejected, so every
/// alphabet character is equally likely.
///
/// # Errors
///
/// Returns an error if the alphabet is empty or larger than 256 symbols, or
/// if the OS entropy source fails.
pub fn generate_secret(spec: &SecretSpec) -> Result<String> {
    let n = spec.alphabet.len();
    if n == 0 || n > 256 {
        anyhow::bail!("alphabet must have between 1 and 256 characters, got {n}");
    }
    // Largest multiple of n that fits in a byte's range.
    let limit = 256 - (256 % n);

    let mut out = String::with_capacity(spec.length);
    let mut produced = 0;
    let mut buf = [0u8; 64];
    while produced < spec.length {
        OsRng
            .try_fill_bytes(&mut buf)
            .context("reading from the OS entropy source")?;
        for &b in &buf {
            if usize::from(b) < limit {
                out.push(char::from(spec.alphabet[usize::from(b) % n]));
                produced += 1;
                if produced == spec.length {
                    break;
                }
            }
        }
    }
    Ok(out)
}
