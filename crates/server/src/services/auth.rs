//! Password hashing.
//!
//! Services only see the [`Hasher`] capability; production wires in
//! [`Argon2Hasher`].

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("password hashing failed")]
pub struct HashError;

/// Turns passwords into stored digests and checks them later.
pub trait Hasher: Send + Sync {
    /// # Errors
    ///
    /// Returns `HashError` if the digest cannot be produced.
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Whether `password` matches `digest`. Malformed digests never match.
    fn verify(&self, password: &str, digest: &str) -> bool;
}

/// Argon2id with the crate's default parameters and a random salt per digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Hasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| HashError)
    }

    fn verify(&self, password: &str, digest: &str) -> bool {
        PasswordHash::new(digest).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}
