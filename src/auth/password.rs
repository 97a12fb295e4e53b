//! Password hashing.
//!
//! The hashing algorithm sits behind `CredentialHasher` so handlers only rely
//! on the hash/verify contract. `Argon2Hasher` is the default.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

pub trait CredentialHasher: Send + Sync {
    /// One-way hash of a plaintext password, in PHC string format.
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// True if `password` matches `hash`. A malformed hash never matches.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_and_salted() {
        let hasher = Argon2Hasher;
        let a = hasher.hash("pa55word").unwrap();
        let b = hasher.hash("pa55word").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify() {
        let hasher = Argon2Hasher;
        let hash = hasher.hash("pa55word").unwrap();
        assert!(hasher.verify("pa55word", &hash));
        assert!(!hasher.verify("wrong password", &hash));
        assert!(!hasher.verify("pa55word", "not-a-phc-string"));
    }
}
