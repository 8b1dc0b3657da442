//! Storage backend port - parameterized SQL with a per-call deadline

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A bound parameter or a result cell.
///
/// JSON values double as the SQL value model: objects and arrays are bound
/// as JSON text, everything else maps onto the matching scalar type.
pub type SqlValue = JsonValue;

/// Failures reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("no rows returned")]
    NotFound,

    /// `column` is known when the backend names it; `value` is the
    /// duplicate key as reported
    #[error("unique constraint violated on {}", .column.as_deref().unwrap_or("unknown column"))]
    UniqueViolation {
        column: Option<String>,
        value: Option<String>,
    },

    #[error("deadline of {}ms exceeded", .0.as_millis())]
    Timeout(Duration),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("cannot decode column: {0}")]
    Decode(String),
}

/// A single result row with named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw cell for a column, if the column exists
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    fn require(&self, column: &str) -> Result<&SqlValue, StorageError> {
        self.get(column)
            .ok_or_else(|| StorageError::Decode(format!("missing column {}", column)))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, StorageError> {
        self.require(column)?
            .as_i64()
            .ok_or_else(|| StorageError::Decode(format!("{} is not an integer", column)))
    }

    pub fn get_str(&self, column: &str) -> Result<&str, StorageError> {
        self.require(column)?
            .as_str()
            .ok_or_else(|| StorageError::Decode(format!("{} is not text", column)))
    }

    /// Text column that may be NULL
    pub fn get_opt_str(&self, column: &str) -> Result<Option<String>, StorageError> {
        match self.require(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::String(s) => Ok(Some(s.clone())),
            _ => Err(StorageError::Decode(format!("{} is not text", column))),
        }
    }

    pub fn get_bool(&self, column: &str) -> Result<bool, StorageError> {
        self.require(column)?
            .as_bool()
            .ok_or_else(|| StorageError::Decode(format!("{} is not a boolean", column)))
    }

    /// JSON column; text cells are parsed, NULL stays `Null`
    pub fn get_json(&self, column: &str) -> Result<JsonValue, StorageError> {
        match self.require(column)? {
            SqlValue::String(s) => serde_json::from_str(s)
                .map_err(|e| StorageError::Decode(format!("{} is not valid JSON: {}", column, e))),
            other => Ok(other.clone()),
        }
    }
}

/// Relational datastore abstraction.
///
/// Placeholders are positional `?`. Implementations own their connection
/// pool and must give up on a call once `deadline` has elapsed.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Run a statement and return the number of affected rows
    async fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
        deadline: Duration,
    ) -> Result<u64, StorageError>;

    /// Run a query and return every row
    async fn query(
        &self,
        sql: &str,
        params: &[SqlValue],
        deadline: Duration,
    ) -> Result<Vec<Row>, StorageError>;

    /// Run a query expected to produce one row; zero rows is `NotFound`
    async fn query_row(
        &self,
        sql: &str,
        params: &[SqlValue],
        deadline: Duration,
    ) -> Result<Row, StorageError> {
        self.query(sql, params, deadline)
            .await?
            .into_iter()
            .next()
            .ok_or(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row() -> Row {
        Row::new(
            vec![
                "id".to_string(),
                "name".to_string(),
                "notes".to_string(),
                "flag".to_string(),
                "payload".to_string(),
            ],
            vec![
                json!(7),
                json!("alice"),
                SqlValue::Null,
                json!(true),
                json!("{\"gold\": 3}"),
            ],
        )
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_str("name").unwrap(), "alice");
        assert_eq!(row.get_opt_str("notes").unwrap(), None);
        assert!(row.get_bool("flag").unwrap());
        assert_eq!(row.get_json("payload").unwrap(), json!({"gold": 3}));
        assert_eq!(row.get_json("notes").unwrap(), SqlValue::Null);
    }

    #[test]
    fn test_getter_errors_are_decode_errors() {
        let row = row();
        assert!(matches!(row.get_i64("name"), Err(StorageError::Decode(_))));
        assert!(matches!(row.get_str("missing"), Err(StorageError::Decode(_))));
        assert!(matches!(row.get_bool("id"), Err(StorageError::Decode(_))));
        assert!(matches!(row.get_json("name"), Err(StorageError::Decode(_))));
    }
}
