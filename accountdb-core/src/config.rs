//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "databasePath": "accountdb.duckdb",
//!   "queryTimeoutMs": 5000,
//!   "poolMaxSize": 8
//! }
//! ```
//! Environment variables override the file (`ACCOUNTDB_DATABASE`,
//! `ACCOUNTDB_QUERY_TIMEOUT_MS`, `ACCOUNTDB_POOL_SIZE`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::duckdb::{PoolConfig, DEFAULT_POOL_SIZE};
use crate::domain::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5000;

pub const ENV_DATABASE: &str = "ACCOUNTDB_DATABASE";
pub const ENV_QUERY_TIMEOUT_MS: &str = "ACCOUNTDB_QUERY_TIMEOUT_MS";
pub const ENV_POOL_SIZE: &str = "ACCOUNTDB_POOL_SIZE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    query_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pool_max_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Account store configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file; `None` keeps everything in memory
    pub database_path: Option<PathBuf>,
    pub query_timeout_ms: u64,
    pub pool_max_size: u32,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            pool_max_size: DEFAULT_POOL_SIZE,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// In-memory configuration with default limits
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Configuration backed by a database file
    pub fn with_database(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Load config from a data directory, then apply environment overrides.
    ///
    /// A relative `databasePath` is resolved against `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_file(data_dir)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn load_file(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("invalid {}: {}", settings_path.display(), e))
            })?
        } else {
            SettingsFile::default()
        };

        let database_path = raw.database_path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                data_dir.join(p)
            }
        });

        Ok(Self {
            database_path,
            query_timeout_ms: raw.query_timeout_ms.unwrap_or(DEFAULT_QUERY_TIMEOUT_MS),
            pool_max_size: raw.pool_max_size.unwrap_or(DEFAULT_POOL_SIZE),
            _raw_settings: raw,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DATABASE).filter(|p| !p.trim().is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_QUERY_TIMEOUT_MS) {
            self.query_timeout_ms = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a number of milliseconds, got {:?}", ENV_QUERY_TIMEOUT_MS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_POOL_SIZE) {
            self.pool_max_size = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a positive integer, got {:?}", ENV_POOL_SIZE, raw))
            })?;
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.query_timeout_ms == 0 {
            return Err(Error::Config("query timeout must be greater than zero".to_string()));
        }
        if self.pool_max_size == 0 {
            return Err(Error::Config("pool size must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Write a first `settings.json` if the data directory has none.
    ///
    /// Only defaults are persisted, never environment overrides; a missing
    /// database path becomes `default_database`. Returns whether a file was
    /// written.
    pub fn init_settings(data_dir: &Path, default_database: &Path) -> Result<bool> {
        if data_dir.join(SETTINGS_FILE).exists() {
            return Ok(false);
        }
        Self::with_database(default_database).save(data_dir)?;
        Ok(true)
    }

    /// Save config to the data directory.
    /// Preserves other settings that this crate doesn't manage.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_else(|_| self._raw_settings.clone())
        } else {
            self._raw_settings.clone()
        };

        settings.database_path = self.database_path.as_ref().map(|p| {
            p.strip_prefix(data_dir).map(Path::to_path_buf).unwrap_or_else(|_| p.clone())
        });
        settings.query_timeout_ms = Some(self.query_timeout_ms);
        settings.pool_max_size = Some(self.pool_max_size);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Connection pool settings for the DuckDB backend
    pub fn pool_config(&self) -> PoolConfig {
        let base = match &self.database_path {
            Some(path) => PoolConfig::file(path),
            None => PoolConfig::in_memory(),
        };
        base.with_max_size(self.pool_max_size)
            .with_connection_timeout(self.query_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_file(dir.path()).unwrap();
        config.apply_overrides(no_env).unwrap();

        assert!(config.database_path.is_none());
        assert_eq!(config.query_timeout(), Duration::from_secs(5));
        assert_eq!(config.pool_max_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_settings_file_relative_path_resolves_against_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"databasePath": "accounts.duckdb", "queryTimeoutMs": 250, "poolMaxSize": 2}"#,
        )
        .unwrap();

        let config = Config::load_file(dir.path()).unwrap();
        assert_eq!(config.database_path, Some(dir.path().join("accounts.duckdb")));
        assert_eq!(config.query_timeout(), Duration::from_millis(250));
        assert_eq!(config.pool_max_size, 2);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), r#"{"queryTimeoutMs": 250}"#).unwrap();

        let mut config = Config::load_file(dir.path()).unwrap();
        config
            .apply_overrides(|name| match name {
                ENV_QUERY_TIMEOUT_MS => Some("1200".to_string()),
                ENV_DATABASE => Some("/tmp/elsewhere.duckdb".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.query_timeout_ms, 1200);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/elsewhere.duckdb")));
    }

    #[test]
    fn test_bad_overrides_are_config_errors() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == ENV_QUERY_TIMEOUT_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == ENV_POOL_SIZE).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_settings_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{not json").unwrap();
        assert!(matches!(Config::load_file(dir.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_init_settings_ignores_environment_overrides() {
        let dir = TempDir::new().unwrap();
        let default_db = dir.path().join("accountdb.duckdb");

        std::env::set_var(ENV_QUERY_TIMEOUT_MS, "1234");
        std::env::set_var(ENV_DATABASE, "/tmp/one-off.duckdb");
        let overridden = Config::load(dir.path());
        let written = Config::init_settings(dir.path(), &default_db);
        std::env::remove_var(ENV_QUERY_TIMEOUT_MS);
        std::env::remove_var(ENV_DATABASE);

        let overridden = overridden.unwrap();
        assert_eq!(overridden.query_timeout_ms, 1234);
        assert!(written.unwrap());

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap()).unwrap();
        assert_eq!(saved["queryTimeoutMs"], DEFAULT_QUERY_TIMEOUT_MS);
        assert_eq!(saved["databasePath"], "accountdb.duckdb");

        // Existing settings are left alone
        assert!(!Config::init_settings(dir.path(), &default_db).unwrap());
    }

    #[test]
    fn test_save_preserves_unmanaged_fields() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"theme": "dark", "queryTimeoutMs": 250}"#,
        )
        .unwrap();

        let mut config = Config::load_file(dir.path()).unwrap();
        config.query_timeout_ms = 900;
        config.database_path = Some(dir.path().join("accounts.duckdb"));
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["queryTimeoutMs"], 900);
        assert_eq!(saved["databasePath"], "accounts.duckdb");
    }
}
