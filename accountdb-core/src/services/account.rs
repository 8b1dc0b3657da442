//! Account repository - create, fetch, update and verify account records

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use super::credentials::hash_blocking;
use super::{bounded, DEFAULT_QUERY_TIMEOUT};
use crate::domain::{Account, AccountUpdate, Error, Result};
use crate::ports::{CredentialHasher, Row, SqlValue, StorageBackend, StorageError};

const SELECT_ACCOUNT: &str = "SELECT account_id, username, email, password,
        COALESCE(email_verified, FALSE) AS email_verified
     FROM accountsettings
     WHERE username = ?";

/// Account record operations over the `accountsettings` table
#[derive(Clone)]
pub struct AccountRepository {
    backend: Arc<dyn StorageBackend>,
    hasher: Arc<dyn CredentialHasher>,
    deadline: Duration,
}

impl AccountRepository {
    pub fn new(backend: Arc<dyn StorageBackend>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            backend,
            hasher,
            deadline: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Insert a new account and return its id.
    ///
    /// `password_digest` must already be hashed; the repository refuses
    /// anything the configured hasher does not recognise as its own digest.
    pub async fn create(&self, username: &str, password_digest: &str, email: &str) -> Result<i64> {
        if username.trim().is_empty() {
            return Err(Error::validation("username cannot be empty"));
        }
        if email.trim().is_empty() {
            return Err(Error::validation("email cannot be empty"));
        }
        if !self.hasher.is_digest(password_digest) {
            return Err(Error::validation("password must be hashed before it is stored"));
        }

        let row = bounded(
            self.deadline,
            self.backend.query_row(
                "INSERT INTO accountsettings (username, password, email)
                 VALUES (?, ?, ?)
                 RETURNING account_id",
                &[json!(username), json!(password_digest), json!(email)],
                self.deadline,
            ),
        )
        .await
        .map_err(|err| {
            let err = attribute_violation(err, &[("username", username), ("email", email)]);
            self.log_failure("create", username, err)
        })?;

        let account_id = row.get_i64("account_id")?;
        info!(account_id, username, "account created");
        Ok(account_id)
    }

    /// Hash `password` with the configured hasher, then [`create`](Self::create)
    pub async fn create_with_password(&self, username: &str, password: &str, email: &str) -> Result<i64> {
        let digest = hash_blocking(Arc::clone(&self.hasher), password.to_string()).await?;
        self.create(username, &digest, email).await
    }

    /// Fetch an account by username
    pub async fn get_by_username(&self, username: &str) -> Result<Account> {
        let row = bounded(
            self.deadline,
            self.backend
                .query_row(SELECT_ACCOUNT, &[json!(username)], self.deadline),
        )
        .await
        .map_err(|err| match err {
            StorageError::NotFound => Error::not_found(format!("account {}", username)),
            other => self.log_failure("get_by_username", username, other),
        })?;

        Ok(row_to_account(&row)?)
    }

    /// Apply a partial update; absent fields keep their stored value.
    ///
    /// An empty update only confirms the account exists.
    pub async fn update(&self, username: &str, update: &AccountUpdate) -> Result<()> {
        update.validate().map_err(Error::validation)?;

        if update.is_empty() {
            self.get_by_username(username).await?;
            debug!(username, "empty account update, nothing to change");
            return Ok(());
        }

        let mut assignments = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();
        if let Some(new_username) = &update.new_username {
            assignments.push("username = ?");
            params.push(json!(new_username));
        }
        if let Some(new_email) = &update.new_email {
            assignments.push("email = ?");
            params.push(json!(new_email));
        }
        params.push(json!(username));

        let sql = format!(
            "UPDATE accountsettings SET {} WHERE username = ?",
            assignments.join(", ")
        );

        let mut candidates = Vec::new();
        if let Some(new_username) = &update.new_username {
            candidates.push(("username", new_username.as_str()));
        }
        if let Some(new_email) = &update.new_email {
            candidates.push(("email", new_email.as_str()));
        }

        let affected = bounded(self.deadline, self.backend.execute(&sql, &params, self.deadline))
            .await
            .map_err(|err| {
                let err = attribute_violation(err, &candidates);
                self.log_failure("update", username, err)
            })?;

        if affected == 0 {
            return Err(Error::not_found(format!("account {}", username)));
        }

        info!(
            username,
            renamed = update.new_username.is_some(),
            email_changed = update.new_email.is_some(),
            "account updated"
        );
        Ok(())
    }

    /// Set `email_verified`; verifying twice is not an error
    pub async fn mark_email_verified(&self, username: &str) -> Result<()> {
        let affected = bounded(
            self.deadline,
            self.backend.execute(
                "UPDATE accountsettings SET email_verified = TRUE WHERE username = ?",
                &[json!(username)],
                self.deadline,
            ),
        )
        .await
        .map_err(|err| self.log_failure("mark_email_verified", username, err))?;

        if affected == 0 {
            return Err(Error::not_found(format!("account {}", username)));
        }

        info!(username, "email verified");
        Ok(())
    }

    fn log_failure(&self, operation: &'static str, username: &str, err: StorageError) -> Error {
        let err = Error::from(err);
        match &err {
            Error::Duplicate { field } => debug!(operation, username, %field, "duplicate account field"),
            _ => warn!(operation, username, error = %err, "account operation failed"),
        }
        err
    }
}

/// Name the violated column when the backend reported only the key value.
///
/// `candidates` pairs each unique column with the value this statement wrote
/// to it; the first match wins.
fn attribute_violation(err: StorageError, candidates: &[(&str, &str)]) -> StorageError {
    match err {
        StorageError::UniqueViolation {
            column: None,
            value: Some(value),
        } => {
            let column = candidates
                .iter()
                .find(|(_, written)| *written == value)
                .map(|(column, _)| column.to_string());
            StorageError::UniqueViolation {
                column,
                value: Some(value),
            }
        }
        other => other,
    }
}

fn row_to_account(row: &Row) -> std::result::Result<Account, StorageError> {
    Ok(Account {
        id: row.get_i64("account_id")?,
        username: row.get_str("username")?.to_string(),
        email: row.get_str("email")?.to_string(),
        password_hash: row.get_str("password")?.to_string(),
        email_verified: row.get_bool("email_verified")?,
    })
}
