//! CLI command implementations

pub mod init;
pub mod login;
pub mod show;
pub mod signup;
pub mod tx;
pub mod update;
pub mod verify;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use tracing::debug;

use accountdb_core::config::Config;
use accountdb_core::AccountDbContext;

/// Overrides the data directory (default `~/.accountdb`)
pub const ENV_DIR: &str = "ACCOUNTDB_DIR";

/// Database file used when settings name none
pub const DATABASE_FILE: &str = "accountdb.duckdb";

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DIR) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".accountdb"))
        .with_context(|| format!("Could not find home directory; set {}", ENV_DIR))
}

/// Load settings for the data directory, defaulting the database file into it
pub fn load_config() -> Result<(PathBuf, Config)> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let mut config = Config::load(&data_dir).context("Failed to load settings")?;
    if config.database_path.is_none() {
        config.database_path = Some(data_dir.join(DATABASE_FILE));
    }
    debug!(data_dir = %data_dir.display(), database = ?config.database_path, "configuration loaded");
    Ok((data_dir, config))
}

/// Open the account store
pub async fn get_context() -> Result<AccountDbContext> {
    let (_, config) = load_config()?;
    AccountDbContext::new(config)
        .await
        .context("Failed to open account store")
}

/// Use the given password or prompt for one
pub fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    let p = Password::new().with_prompt("Password").interact()?;
    Ok(p)
}

/// Use the given password or prompt twice for a new one
pub fn new_password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    let p = Password::new()
        .with_prompt("Choose a password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?;
    Ok(p)
}
