//! Session token generation.

use rand::Rng;

/// Length of every session token.
pub const TOKEN_LEN: usize = 20;

/// Generate a token of [`TOKEN_LEN`] uppercase ASCII letters.
pub fn generate() -> String {
    generate_with(&mut rand::thread_rng())
}

/// Same as [`generate`], with a caller-provided RNG.
pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..TOKEN_LEN)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect()
}

/// True when `s` could have been produced by [`generate`].
pub fn is_well_formed(s: &str) -> bool {
    s.len() == TOKEN_LEN && s.bytes().all(|b| b.is_ascii_uppercase())
}
