//! Identity token generation.
//!
//! Identities are fixed-length alphanumeric tokens. Candidates come from an
//! [`IdentitySource`] so tests can script the sequence; the production source
//! draws uniformly from the thread RNG. Uniqueness against the live key set
//! is enforced by the store at registration time, not here.

use rand::Rng;

/// Length of every issued identity token.
pub const IDENTITY_LEN: usize = 8;

/// The 62-symbol alphabet identities are drawn from.
pub const IDENTITY_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Source of candidate identity tokens.
///
/// Implementations return one candidate per call. The caller retries until a
/// candidate does not collide with a live identity.
pub trait IdentitySource: Send + Sync {
    fn candidate(&self) -> String;
}

/// Uniform random identities from the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentities;

impl IdentitySource for RandomIdentities {
    fn candidate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..IDENTITY_LEN)
            .map(|_| IDENTITY_ALPHABET[rng.gen_range(0..IDENTITY_ALPHABET.len())] as char)
            .collect()
    }
}

/// Whether `s` has the shape of an issued identity: exactly
/// [`IDENTITY_LEN`] ASCII alphanumeric characters.
#[must_use]
pub fn is_valid_identity(s: &str) -> bool {
    s.len() == IDENTITY_LEN && s.bytes().all(|b| b.is_ascii_alphanumeric())
}
