//! accountdb core - account records, credentials and transaction history
//!
//! This crate implements the persistence core following hexagonal architecture:
//!
//! - **domain**: Core entities (Account, TransactionRecord) and the error type
//! - **ports**: Trait definitions for external dependencies (StorageBackend, CredentialHasher)
//! - **services**: Account repository, credential validation, transaction recording, schema setup
//! - **adapters**: Concrete implementations (pooled DuckDB, Argon2id)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod schema;
pub mod services;

use std::sync::Arc;

use tracing::info;

use adapters::argon2_hasher::Argon2Hasher;
use adapters::duckdb::DuckDbBackend;
use config::Config;
use ports::{CredentialHasher, StorageBackend};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    Account, AccountUpdate, DuplicateField, Error, NewTransaction, Result, TransactionRecord,
    DEFAULT_TRANSACTION_STATUS,
};
pub use services::Validation;

/// Main context for account store operations
///
/// Holds the configuration, the storage backend and every service. It is
/// built explicitly and passed to callers; cloning it shares the pool.
#[derive(Clone)]
pub struct AccountDbContext {
    pub config: Config,
    pub backend: Arc<dyn StorageBackend>,
    pub schema: SchemaInitializer,
    pub accounts: AccountRepository,
    pub credentials: CredentialValidator,
    pub transactions: TransactionRecorder,
}

impl AccountDbContext {
    /// Open the configured DuckDB database and make sure the tables exist
    pub async fn new(config: Config) -> Result<Self> {
        let backend = DuckDbBackend::open(&config.pool_config())?;
        info!(location = backend.location(), "account store opened");
        Self::with_backend(config, Arc::new(backend), Arc::new(Argon2Hasher::new())).await
    }

    /// Build the context over any backend and hasher, then ensure the schema
    pub async fn with_backend(
        config: Config,
        backend: Arc<dyn StorageBackend>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self> {
        let context = Self::assemble(config, backend, hasher);
        context.schema.ensure_schema().await?;
        Ok(context)
    }

    /// Wire services without touching the database
    pub fn assemble(
        config: Config,
        backend: Arc<dyn StorageBackend>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        let deadline = config.query_timeout();

        let schema = SchemaInitializer::new(Arc::clone(&backend)).with_deadline(deadline);
        let accounts = AccountRepository::new(Arc::clone(&backend), Arc::clone(&hasher))
            .with_deadline(deadline);
        let credentials = CredentialValidator::new(accounts.clone(), hasher);
        let transactions = TransactionRecorder::new(Arc::clone(&backend)).with_deadline(deadline);

        Self {
            config,
            backend,
            schema,
            accounts,
            credentials,
            transactions,
        }
    }
}
