//! Token generation and hashing.
//!
//! Tokens are 16 bytes from the OS CSPRNG, encoded as base-32 without
//! padding, which always yields 26 characters. Only the SHA-256 digest of the
//! plaintext is ever persisted or compared.

use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes behind each token.
const TOKEN_RANDOM_BYTES: usize = 16;

/// Length of the encoded plaintext.
pub const TOKEN_PLAINTEXT_LEN: usize = 26;

/// Generate a new plaintext token and its digest.
pub fn generate_token() -> (String, Vec<u8>) {
    let mut random_bytes = [0u8; TOKEN_RANDOM_BYTES];
    OsRng.fill_bytes(&mut random_bytes);

    let plaintext = BASE32_NOPAD.encode(&random_bytes);
    let hash = hash_token(&plaintext);
    (plaintext, hash)
}

/// SHA-256 digest of a plaintext token.
pub fn hash_token(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Shape check performed before any store lookup.
pub fn is_valid_token_format(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_PLAINTEXT_LEN
}
