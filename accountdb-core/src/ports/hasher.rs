//! Credential hasher port

use crate::domain::Result;

/// One-way, salted password hashing.
///
/// `hash` must use a fresh random salt on every call. `verify` answers
/// false for any mismatch, including a digest it cannot parse.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    fn verify(&self, plaintext: &str, digest: &str) -> bool;

    /// Whether `candidate` has the shape of a digest this hasher produces.
    ///
    /// Used to refuse plaintext before it is stored.
    fn is_digest(&self, candidate: &str) -> bool {
        !candidate.trim().is_empty()
    }
}
