//! Webhook token generation and comparison.

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Bytes of OS randomness behind each token.
const TOKEN_BYTES: usize = 32;

/// Generate a new webhook token: 32 random bytes as 64 lowercase hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compare a presented token against an expected one in constant time.
///
/// Only the length check short-circuits, which leaks nothing about the
/// expected token's content.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
