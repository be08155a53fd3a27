//! Salted one-way credential hashing (argon2id, PHC string format).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid hashing parameters: {0}")]
    InvalidParams(String),

    #[error("stored credential hash is malformed: {0}")]
    MalformedHash(String),

    #[error("credential hashing failed: {0}")]
    Hashing(String),
}

/// One-way credential hashing primitive.
///
/// Implementations are CPU-bound; callers on an async runtime should run them
/// on a blocking thread.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext credential with a fresh random salt.
    fn hash(&self, credential: &str) -> Result<String, CredentialError>;

    /// Verify a plaintext credential against a stored hash.
    ///
    /// A mismatch is `Ok(false)`; `Err` is reserved for unusable hashes.
    fn verify(&self, credential: &str, stored_hash: &str) -> Result<bool, CredentialError>;
}

#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    argon: Argon2<'static>,
}

impl Argon2Hasher {
    /// argon2id with the library's recommended default cost.
    pub fn new() -> Self {
        Self {
            argon: Argon2::default(),
        }
    }

    /// argon2id with an explicit memory cost (KiB) and iteration count.
    pub fn with_cost(memory_kib: u32, iterations: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| CredentialError::InvalidParams(e.to_string()))?;
        Ok(Self {
            argon: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, credential: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon
            .hash_password(credential.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, credential: &str, stored_hash: &str) -> Result<bool, CredentialError> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

        match self.argon.verify_password(credential.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::Hashing(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_cost(1024, 1).unwrap()
    }

    #[test]
    fn hash_never_contains_plaintext_and_verifies() {
        let h = hasher();
        let hash = h.hash("correct horse").unwrap();

        assert!(!hash.contains("correct horse"));
        assert!(hash.starts_with("$argon2id$"));
        assert!(h.verify("correct horse", &hash).unwrap());
        assert!(!h.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn same_credential_gets_distinct_salts() {
        let h = hasher();
        assert_ne!(h.hash("pw-123456").unwrap(), h.hash("pw-123456").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error_not_a_mismatch() {
        let err = hasher().verify("pw", "plaintext-in-db").unwrap_err();
        assert!(matches!(err, CredentialError::MalformedHash(_)));
    }

    #[test]
    fn rejects_impossible_cost() {
        assert!(matches!(
            Argon2Hasher::with_cost(1, 1),
            Err(CredentialError::InvalidParams(_))
        ));
    }
}
