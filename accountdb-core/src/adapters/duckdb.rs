//! DuckDB storage backend
//!
//! Connections come from an `r2d2` pool over a single DuckDB database
//! instance (file or in-memory). DuckDB calls are blocking, so each call
//! runs on tokio's blocking pool and the caller waits at most `deadline`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use duckdb::types::ValueRef;
use duckdb::{Connection, DuckdbConnectionManager};
use r2d2::Pool;
use regex::Regex;
use tracing::{debug, warn};

use crate::ports::{Row, SqlValue, StorageBackend, StorageError};

/// Default number of pooled connections
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Default time allowed for opening the initial connections
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the DuckDB connection pool.
///
/// ```ignore
/// let config = PoolConfig::file("/var/lib/accountdb/accounts.duckdb").with_max_size(4);
/// let backend = DuckDbBackend::open(&config)?;
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_path: Option<PathBuf>,
    max_size: u32,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Pool over a database file, created on first open
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            max_size: DEFAULT_POOL_SIZE,
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Pool over a private in-memory database shared by all its connections
    pub fn in_memory() -> Self {
        Self {
            database_path: None,
            max_size: DEFAULT_POOL_SIZE,
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }
}

/// Pooled DuckDB implementation of [`StorageBackend`]
#[derive(Clone)]
pub struct DuckDbBackend {
    pool: Pool<DuckdbConnectionManager>,
    location: String,
}

impl DuckDbBackend {
    /// Open the database and fill the pool
    pub fn open(config: &PoolConfig) -> Result<Self, StorageError> {
        // IMPORTANT: no extension autoloading (macOS code signing)
        let flags = || {
            duckdb::Config::default()
                .enable_autoload_extension(false)
                .map_err(|e| StorageError::Pool(format!("invalid duckdb config: {}", e)))
        };

        let (manager, location) = match config.database_path() {
            Some(path) => (
                DuckdbConnectionManager::file_with_flags(path, flags()?),
                path.display().to_string(),
            ),
            None => (
                DuckdbConnectionManager::memory_with_flags(flags()?),
                ":memory:".to_string(),
            ),
        };
        let manager = manager
            .map_err(|e| StorageError::Pool(format!("failed to open {}: {}", location, e)))?;

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .map_err(|e| StorageError::Pool(format!("failed to build pool: {}", e)))?;

        debug!(%location, max_size = config.max_size, "opened duckdb pool");
        Ok(Self { pool, location })
    }

    /// Shorthand for a fresh in-memory database
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::open(&PoolConfig::in_memory())
    }

    /// Where the database lives (path or `:memory:`)
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Run `work` on a pooled connection, bounded by `deadline`.
    ///
    /// When the deadline passes the caller gets `Timeout` straight away; a
    /// statement that already started finishes on the blocking pool and its
    /// result is dropped.
    async fn with_connection<T, F>(&self, deadline: Duration, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || {
            let conn = pool
                .get_timeout(deadline)
                .map_err(|e| StorageError::Pool(e.to_string()))?;
            work(&conn)
        });

        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, "duckdb call finished");
                result
            }
            Ok(Err(join_err)) => Err(StorageError::Query(format!(
                "database task failed: {}",
                join_err
            ))),
            Err(_) => {
                warn!(
                    location = %self.location,
                    deadline_ms = deadline.as_millis() as u64,
                    "duckdb call exceeded its deadline"
                );
                Err(StorageError::Timeout(deadline))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for DuckDbBackend {
    async fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
        deadline: Duration,
    ) -> Result<u64, StorageError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_connection(deadline, move |conn| run_execute(conn, &sql, &params))
            .await
    }

    async fn query(
        &self,
        sql: &str,
        params: &[SqlValue],
        deadline: Duration,
    ) -> Result<Vec<Row>, StorageError> {
        let sql = sql.to_string();
        let params = params.to_vec();
        self.with_connection(deadline, move |conn| run_query(conn, &sql, &params))
            .await
    }
}

fn run_execute(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<u64, StorageError> {
    let bound = bind_params(params);
    let refs: Vec<&dyn duckdb::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.prepare(sql).map_err(classify_error)?;
    let affected = stmt.execute(refs.as_slice()).map_err(classify_error)?;
    Ok(affected as u64)
}

fn run_query(conn: &Connection, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StorageError> {
    let bound = bind_params(params);
    let refs: Vec<&dyn duckdb::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.prepare(sql).map_err(classify_error)?;
    let mut result_rows = stmt.query(refs.as_slice()).map_err(classify_error)?;

    let mut rows: Vec<Vec<SqlValue>> = Vec::new();
    let mut column_count = 0;

    while let Some(row) = result_rows.next().map_err(classify_error)? {
        if rows.is_empty() {
            column_count = row.as_ref().column_count();
        }

        let mut cells = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            cells.push(cell_value(row, idx)?);
        }
        rows.push(cells);
    }

    drop(result_rows);

    let columns: Vec<String> = (0..column_count)
        .map(|i| {
            stmt.column_name(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| format!("col{}", i))
        })
        .collect();

    Ok(rows
        .into_iter()
        .map(|cells| Row::new(columns.clone(), cells))
        .collect())
}

/// Convert JSON values to DuckDB parameters
fn bind_params(params: &[SqlValue]) -> Vec<Box<dyn duckdb::ToSql>> {
    params
        .iter()
        .map(|value| -> Box<dyn duckdb::ToSql> {
            match value {
                SqlValue::Null => Box::new(None::<String>),
                SqlValue::Bool(b) => Box::new(*b),
                SqlValue::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        Box::new(i)
                    } else if let Some(f) = n.as_f64() {
                        Box::new(f)
                    } else {
                        Box::new(n.to_string())
                    }
                }
                SqlValue::String(s) => Box::new(s.clone()),
                // Structured payloads go into JSON columns as text
                SqlValue::Array(_) | SqlValue::Object(_) => Box::new(value.to_string()),
            }
        })
        .collect()
}

fn cell_value(row: &duckdb::Row, idx: usize) -> Result<SqlValue, StorageError> {
    let value = row
        .get_ref(idx)
        .map_err(|e| StorageError::Decode(format!("column {}: {}", idx, e)))?;

    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Boolean(b) => SqlValue::Bool(b),
        ValueRef::TinyInt(i) => serde_json::json!(i),
        ValueRef::SmallInt(i) => serde_json::json!(i),
        ValueRef::Int(i) => serde_json::json!(i),
        ValueRef::BigInt(i) => serde_json::json!(i),
        ValueRef::HugeInt(i) => serde_json::json!(i.to_string()),
        ValueRef::UTinyInt(i) => serde_json::json!(i),
        ValueRef::USmallInt(i) => serde_json::json!(i),
        ValueRef::UInt(i) => serde_json::json!(i),
        ValueRef::UBigInt(i) => serde_json::json!(i),
        ValueRef::Float(f) => serde_json::json!(f),
        ValueRef::Double(f) => serde_json::json!(f),
        ValueRef::Text(bytes) => SqlValue::String(String::from_utf8_lossy(bytes).to_string()),
        other => {
            return Err(StorageError::Decode(format!(
                "column {} has unsupported value {:?}; cast it to VARCHAR",
                idx, other
            )))
        }
    })
}

/// `Duplicate key "column: value" violates unique constraint`
fn keyed_violation_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)duplicate key "([A-Za-z_][A-Za-z0-9_]*): ([^"]*)" violates (?:unique|primary key) constraint"#)
            .ok()
    })
    .as_ref()
}

/// Commit-time form, which carries only the key value:
/// `PRIMARY KEY or UNIQUE constraint violation: duplicate key "value"`
fn bare_violation_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)(?:unique constraint violation: )?duplicate key "([^"]*)""#).ok())
        .as_ref()
}

/// Classify a DuckDB error message into a storage error
fn classify_message(msg: &str) -> StorageError {
    if let Some(caps) = keyed_violation_re().and_then(|re| re.captures(msg)) {
        return StorageError::UniqueViolation {
            column: caps.get(1).map(|m| m.as_str().to_string()),
            value: caps.get(2).map(|m| m.as_str().to_string()),
        };
    }

    if let Some(caps) = bare_violation_re().and_then(|re| re.captures(msg)) {
        return StorageError::UniqueViolation {
            column: None,
            value: caps.get(1).map(|m| m.as_str().to_string()),
        };
    }

    let lower = msg.to_lowercase();
    if (lower.contains("constraint error") || lower.contains("constraint violation"))
        && lower.contains("duplicate key")
    {
        return StorageError::UniqueViolation {
            column: None,
            value: None,
        };
    }

    StorageError::Query(msg.to_string())
}

fn classify_error(err: duckdb::Error) -> StorageError {
    if matches!(err, duckdb::Error::QueryReturnedNoRows) {
        return StorageError::NotFound;
    }
    classify_message(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEADLINE: Duration = Duration::from_secs(5);

    #[test]
    fn test_classify_unique_violation_extracts_column() {
        let msg = "Constraint Error: Duplicate key \"username: alice\" violates unique constraint. \
                   If this is an unexpected constraint violation please double check with the \
                   known index limitations section in our documentation";
        assert_eq!(
            classify_message(msg),
            StorageError::UniqueViolation {
                column: Some("username".to_string()),
                value: Some("alice".to_string()),
            }
        );

        let msg = "Constraint Error: Duplicate key \"email: a@x.com\" violates unique constraint.";
        assert_eq!(
            classify_message(msg),
            StorageError::UniqueViolation {
                column: Some("email".to_string()),
                value: Some("a@x.com".to_string()),
            }
        );
    }

    #[test]
    fn test_classify_commit_time_violation_keeps_value() {
        let msg = "TransactionContext Error: Failed to commit: PRIMARY KEY or UNIQUE constraint \
                   violation: duplicate key \"racer\"";
        assert_eq!(
            classify_message(msg),
            StorageError::UniqueViolation {
                column: None,
                value: Some("racer".to_string()),
            }
        );

        let msg = "TransactionContext Error: Failed to commit: PRIMARY KEY or UNIQUE constraint \
                   violation: duplicate key \"r0@x.com\"";
        assert_eq!(
            classify_message(msg),
            StorageError::UniqueViolation {
                column: None,
                value: Some("r0@x.com".to_string()),
            }
        );
    }

    #[test]
    fn test_classify_other_errors_as_query() {
        let msg = "Catalog Error: Table with name nope does not exist!";
        assert!(matches!(classify_message(msg), StorageError::Query(_)));
    }

    #[test]
    fn test_classify_unparsable_duplicate_key() {
        let msg = "Constraint Error: duplicate key in composite index";
        assert_eq!(
            classify_message(msg),
            StorageError::UniqueViolation {
                column: None,
                value: None,
            }
        );
    }

    #[test]
    fn test_bind_params_serializes_structures_as_json_text() {
        // Only checks that every variant produces a parameter
        let params = vec![
            SqlValue::Null,
            json!(true),
            json!(3),
            json!(2.5),
            json!("text"),
            json!([1, 2]),
            json!({"a": 1}),
        ];
        assert_eq!(bind_params(&params).len(), params.len());
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let backend = DuckDbBackend::in_memory().unwrap();
        assert_eq!(backend.location(), ":memory:");

        backend
            .execute(
                "CREATE TABLE kv (k VARCHAR PRIMARY KEY, v BIGINT, doc JSON)",
                &[],
                DEADLINE,
            )
            .await
            .unwrap();

        let affected = backend
            .execute(
                "INSERT INTO kv VALUES (?, ?, ?)",
                &[json!("a"), json!(1), json!({"x": [1, 2]})],
                DEADLINE,
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let row = backend
            .query_row(
                "SELECT k, v, CAST(doc AS VARCHAR) AS doc FROM kv WHERE k = ?",
                &[json!("a")],
                DEADLINE,
            )
            .await
            .unwrap();
        assert_eq!(row.get_str("k").unwrap(), "a");
        assert_eq!(row.get_i64("v").unwrap(), 1);
        assert_eq!(row.get_json("doc").unwrap(), json!({"x": [1, 2]}));
    }

    #[tokio::test]
    async fn test_query_row_without_rows_is_not_found() {
        let backend = DuckDbBackend::in_memory().unwrap();
        backend
            .execute("CREATE TABLE t (id BIGINT)", &[], DEADLINE)
            .await
            .unwrap();

        let result = backend
            .query_row("SELECT id FROM t WHERE id = ?", &[json!(1)], DEADLINE)
            .await;
        assert_eq!(result, Err(StorageError::NotFound));
    }

    #[tokio::test]
    async fn test_pooled_connections_share_in_memory_database() {
        let backend = DuckDbBackend::open(&PoolConfig::in_memory().with_max_size(4)).unwrap();
        backend
            .execute("CREATE TABLE shared (id BIGINT)", &[], DEADLINE)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8i64 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                backend
                    .execute("INSERT INTO shared VALUES (?)", &[json!(i)], DEADLINE)
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let row = backend
            .query_row("SELECT COUNT(*) AS n FROM shared", &[], DEADLINE)
            .await
            .unwrap();
        assert_eq!(row.get_i64("n").unwrap(), 8);
    }

    #[tokio::test]
    async fn test_unique_violation_surfaces_from_backend() {
        let backend = DuckDbBackend::in_memory().unwrap();
        backend
            .execute("CREATE TABLE u (username VARCHAR UNIQUE)", &[], DEADLINE)
            .await
            .unwrap();
        backend
            .execute("INSERT INTO u VALUES (?)", &[json!("alice")], DEADLINE)
            .await
            .unwrap();

        let err = backend
            .execute("INSERT INTO u VALUES (?)", &[json!("alice")], DEADLINE)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::UniqueViolation {
                column: Some("username".to_string()),
                value: Some("alice".to_string()),
            }
        );
    }

    #[test]
    fn test_file_backed_pool_creates_database() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("pool.duckdb");
        let backend = DuckDbBackend::open(&PoolConfig::file(&path).with_max_size(2)).unwrap();
        assert_eq!(backend.location(), path.display().to_string());
        assert!(path.exists());
    }
}
