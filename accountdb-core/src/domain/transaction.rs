//! Transaction history domain model

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Status every freshly recorded transaction starts in
pub const DEFAULT_TRANSACTION_STATUS: &str = "Pending...";

/// An entry in `transaction_history`.
///
/// Once written, only `status` may change, and never through this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    /// Opaque correlation key, usually a username
    pub client_id: String,
    /// Free-form tag such as "purchase" or "transfer"
    pub transaction_type: String,
    pub items_sent: JsonValue,
    pub items_received: JsonValue,
    pub notes: Option<String>,
    pub status: String,
}

/// Fields supplied by the caller when appending to the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub client_id: String,
    pub transaction_type: String,
    #[serde(default)]
    pub items_sent: JsonValue,
    #[serde(default)]
    pub items_received: JsonValue,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    pub fn new(client_id: impl Into<String>, transaction_type: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            transaction_type: transaction_type.into(),
            items_sent: JsonValue::Null,
            items_received: JsonValue::Null,
            notes: None,
        }
    }

    pub fn with_items_sent(mut self, items: JsonValue) -> Self {
        self.items_sent = items;
        self
    }

    pub fn with_items_received(mut self, items: JsonValue) -> Self {
        self.items_received = items;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// The columns are NOT NULL, so client and type must be present
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.trim().is_empty() {
            return Err("client id cannot be empty");
        }
        if self.transaction_type.trim().is_empty() {
            return Err("transaction type cannot be empty");
        }
        Ok(())
    }
}
