//! Credential validation - username/password checks against stored digests

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AccountRepository;
use crate::domain::{Error, Result};
use crate::ports::CredentialHasher;

/// Outcome of a credential check.
///
/// An unknown user and a wrong password are both ordinary outcomes, not
/// errors. `email_verified` is reported whenever the account exists, so a
/// caller can tell "wrong password" apart from "never verified".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub credentials_valid: bool,
    pub email_verified: bool,
}

impl Validation {
    pub fn as_tuple(&self) -> (bool, bool) {
        (self.credentials_valid, self.email_verified)
    }
}

/// Checks username/password pairs
#[derive(Clone)]
pub struct CredentialValidator {
    accounts: AccountRepository,
    hasher: Arc<dyn CredentialHasher>,
}

impl CredentialValidator {
    pub fn new(accounts: AccountRepository, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { accounts, hasher }
    }

    /// Validate a username/password pair.
    ///
    /// Only infrastructure failures are returned as errors.
    pub async fn validate(&self, username: &str, password: &str) -> Result<Validation> {
        let account = match self.accounts.get_by_username(username).await {
            Ok(account) => account,
            Err(Error::NotFound(_)) => {
                debug!(username, "credential check for unknown account");
                return Ok(Validation::default());
            }
            Err(err) => return Err(err),
        };

        let credentials_valid = verify_blocking(
            Arc::clone(&self.hasher),
            password.to_string(),
            account.password_hash,
        )
        .await?;

        debug!(username, credentials_valid, "credential check finished");
        Ok(Validation {
            credentials_valid,
            email_verified: account.email_verified,
        })
    }
}

// Argon2 is CPU-bound; run it on the blocking pool.

pub(crate) async fn hash_blocking(hasher: Arc<dyn CredentialHasher>, password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| Error::Hashing(format!("hashing task failed: {}", e)))?
}

pub(crate) async fn verify_blocking(
    hasher: Arc<dyn CredentialHasher>,
    password: String,
    digest: String,
) -> Result<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
        .await
        .map_err(|e| Error::Hashing(format!("verification task failed: {}", e)))
}
