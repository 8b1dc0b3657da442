//! Argon2id credential hasher
//!
//! Digests are PHC strings, so the salt and cost parameters travel with the
//! digest and verification never needs outside state.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::domain::{Error, Result};
use crate::ports::CredentialHasher;

/// Argon2id hasher using the crate's recommended default cost
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Custom cost parameters (memory in KiB, iterations, lanes)
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| Error::Hashing(format!("invalid argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| Error::Hashing(e.to_string()))?;
        Ok(digest.to_string())
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// Any parseable PHC string counts, whatever its cost parameters
    fn is_digest(&self, candidate: &str) -> bool {
        PasswordHash::new(candidate).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        // Minimum cost keeps the unit tests fast
        Argon2Hasher::with_params(Params::MIN_M_COST, 1, 1).unwrap()
    }

    #[test]
    fn test_same_password_different_digests() {
        let hasher = hasher();
        let first = hasher.hash("pw1").unwrap();
        let second = hasher.hash("pw1").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("pw1", &first));
        assert!(hasher.verify("pw1", &second));
    }

    #[test]
    fn test_wrong_password_does_not_verify() {
        let hasher = hasher();
        let digest = hasher.hash("correct horse").unwrap();
        assert!(!hasher.verify("battery staple", &digest));
        assert!(!hasher.verify("", &digest));
    }

    #[test]
    fn test_digest_never_contains_plaintext() {
        let hasher = hasher();
        let digest = hasher.hash("plaintext-secret").unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("plaintext-secret"));
    }

    #[test]
    fn test_malformed_digest_is_false_not_error() {
        let hasher = hasher();
        assert!(!hasher.verify("pw", ""));
        assert!(!hasher.verify("pw", "pw"));
        assert!(!hasher.verify("pw", "$argon2id$garbage"));
        assert!(!hasher.verify("pw", "$2a$10$N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy"));
    }

    #[test]
    fn test_default_hasher_verifies_low_cost_digest() {
        // Cost parameters are read back from the PHC string
        let digest = hasher().hash("pw").unwrap();
        assert!(Argon2Hasher::default().verify("pw", &digest));
    }

    #[test]
    fn test_is_digest_accepts_phc_strings_only() {
        let hasher = hasher();
        assert!(hasher.is_digest(&hasher.hash("pw").unwrap()));
        assert!(hasher.is_digest("$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo"));

        assert!(!hasher.is_digest("hunter2"));
        assert!(!hasher.is_digest(""));
        assert!(!hasher.is_digest("$"));
    }

    #[test]
    fn test_invalid_params_are_hashing_errors() {
        let result = Argon2Hasher::with_params(0, 0, 0);
        assert!(matches!(result, Err(Error::Hashing(_))));
    }
}
