//! Schema initializer - creates the account and transaction tables

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use super::{bounded, DEFAULT_QUERY_TIMEOUT};
use crate::domain::{Error, Result};
use crate::ports::{StorageBackend, StorageError};
use crate::schema::{statements, SCHEMA};

/// Applies the embedded table definitions
#[derive(Clone)]
pub struct SchemaInitializer {
    backend: Arc<dyn StorageBackend>,
    deadline: Duration,
}

impl SchemaInitializer {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            deadline: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Create every table that does not exist yet.
    ///
    /// Safe to call on every startup. A rejected definition is a
    /// `Schema` error and should abort startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        for (name, sql) in SCHEMA {
            for stmt in statements(sql) {
                bounded(self.deadline, self.backend.execute(&stmt, &[], self.deadline))
                    .await
                    .map_err(|err| match err {
                        StorageError::Timeout(deadline) => Error::Timeout(deadline),
                        other => {
                            warn!(file = %name, error = %other, "schema statement rejected");
                            Error::Schema(format!("{}: {}", name, other))
                        }
                    })?;
            }
            debug!(file = %name, "schema file applied");
        }

        info!(files = SCHEMA.len(), "schema ready");
        Ok(())
    }

    /// Check if a table exists in the main schema
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let row = bounded(
            self.deadline,
            self.backend.query_row(
                "SELECT COUNT(*) AS n FROM information_schema.tables
                 WHERE table_schema = 'main' AND table_name = ?",
                &[json!(table_name)],
                self.deadline,
            ),
        )
        .await?;
        Ok(row.get_i64("n")? > 0)
    }
}
