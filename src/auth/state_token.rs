//! Anti-CSRF state token
//!
//! One token is generated at startup and shared read-only by every request
//! for the lifetime of the process. A restart invalidates in-flight logins.

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Number of characters in a state token
pub const STATE_LENGTH: usize = 64;

const FIRST_CHAR: u8 = b'!';
const ALPHABET_LEN: u64 = (b'~' - b'!' + 1) as u64;

/// The entropy source could not produce random bytes
#[derive(Debug, Error)]
#[error("entropy source unavailable: {0}")]
pub struct StateTokenError(#[from] rand::Error);

/// Process-wide OAuth `state` value
#[derive(Clone)]
pub struct StateToken(String);

impl StateToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against the value echoed back by the provider
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateToken(<redacted>)")
    }
}

/// Generate a state token from the operating system's CSPRNG
///
/// Each of the 64 characters is drawn uniformly from the 94 printable ASCII
/// characters `'!'..='~'`.
///
/// # Errors
/// Returns `StateTokenError` if the OS entropy source fails.
pub fn generate_state() -> Result<StateToken, StateTokenError> {
    sample_state(&mut OsRng)
}

fn sample_state<R: RngCore + ?Sized>(rng: &mut R) -> Result<StateToken, StateTokenError> {
    // 8 bytes per character keeps the modulo bias below 2^-57
    let mut entropy = [0_u8; STATE_LENGTH * 8];
    rng.try_fill_bytes(&mut entropy)?;

    let token = entropy
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0_u8; 8];
            word.copy_from_slice(chunk);
            let offset = u64::from_le_bytes(word) % ALPHABET_LEN;
            char::from(FIRST_CHAR + offset as u8)
        })
        .collect();

    Ok(StateToken(token))
}
