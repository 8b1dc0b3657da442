//! Transaction recorder - appends to the transaction history

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use super::{bounded, DEFAULT_QUERY_TIMEOUT};
use crate::domain::{Error, NewTransaction, Result, TransactionRecord, DEFAULT_TRANSACTION_STATUS};
use crate::ports::{Row, SqlValue, StorageBackend, StorageError};

const SELECT_TRANSACTION: &str = "SELECT CAST(transaction_id AS VARCHAR) AS transaction_id,
        client_id, transaction_type,
        CAST(items_sent AS VARCHAR) AS items_sent,
        CAST(items_received AS VARCHAR) AS items_received,
        notes, status
     FROM transaction_history";

/// Append-only access to `transaction_history`
#[derive(Clone)]
pub struct TransactionRecorder {
    backend: Arc<dyn StorageBackend>,
    deadline: Duration,
}

impl TransactionRecorder {
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

    /// Append a transaction in the pending state and return its id.
    ///
    /// The id is generated by the database. Payloads are stored as given.
    pub async fn record(&self, tx: &NewTransaction) -> Result<Uuid> {
        tx.validate().map_err(Error::validation)?;

        let row = bounded(
            self.deadline,
            self.backend.query_row(
                "INSERT INTO transaction_history
                    (client_id, transaction_type, items_sent, items_received, notes, status)
                 VALUES (?, ?, ?, ?, ?, ?)
                 RETURNING CAST(transaction_id AS VARCHAR) AS transaction_id",
                &[
                    json!(tx.client_id),
                    json!(tx.transaction_type),
                    json_param(&tx.items_sent),
                    json_param(&tx.items_received),
                    json!(tx.notes),
                    json!(DEFAULT_TRANSACTION_STATUS),
                ],
                self.deadline,
            ),
        )
        .await
        .map_err(|err| log_failure("record", &tx.client_id, err))?;

        let transaction_id = parse_uuid(&row)?;
        info!(
            %transaction_id,
            client_id = %tx.client_id,
            transaction_type = %tx.transaction_type,
            "transaction recorded"
        );
        Ok(transaction_id)
    }

    /// Fetch a single transaction
    pub async fn get(&self, transaction_id: Uuid) -> Result<TransactionRecord> {
        let sql = format!("{} WHERE transaction_id = CAST(? AS UUID)", SELECT_TRANSACTION);
        let row = bounded(
            self.deadline,
            self.backend
                .query_row(&sql, &[json!(transaction_id.to_string())], self.deadline),
        )
        .await
        .map_err(|err| match err {
            StorageError::NotFound => Error::not_found(format!("transaction {}", transaction_id)),
            other => log_failure("get", &transaction_id.to_string(), other),
        })?;

        row_to_transaction(&row)
    }

    /// All transactions for a client, oldest first
    pub async fn list_for_client(&self, client_id: &str) -> Result<Vec<TransactionRecord>> {
        let sql = format!("{} WHERE client_id = ? ORDER BY rowid", SELECT_TRANSACTION);
        let rows = bounded(
            self.deadline,
            self.backend.query(&sql, &[json!(client_id)], self.deadline),
        )
        .await
        .map_err(|err| log_failure("list_for_client", client_id, err))?;

        rows.iter().map(row_to_transaction).collect()
    }
}

/// JSON columns take text; NULL stays NULL
fn json_param(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        other => SqlValue::String(other.to_string()),
    }
}

fn parse_uuid(row: &Row) -> Result<Uuid> {
    let raw = row.get_str("transaction_id")?;
    Uuid::parse_str(raw)
        .map_err(|e| Error::infrastructure(format!("invalid transaction id {}: {}", raw, e)))
}

fn row_to_transaction(row: &Row) -> Result<TransactionRecord> {
    Ok(TransactionRecord {
        transaction_id: parse_uuid(row)?,
        client_id: row.get_str("client_id")?.to_string(),
        transaction_type: row.get_str("transaction_type")?.to_string(),
        items_sent: row.get_json("items_sent")?,
        items_received: row.get_json("items_received")?,
        notes: row.get_opt_str("notes")?,
        status: row
            .get_opt_str("status")?
            .unwrap_or_else(|| DEFAULT_TRANSACTION_STATUS.to_string()),
    })
}

fn log_failure(operation: &'static str, key: &str, err: StorageError) -> Error {
    let err = Error::from(err);
    warn!(operation, key, error = %err, "transaction operation failed");
    err
}
