//! Init command - create the database tables

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use accountdb_core::config::{Config, SETTINGS_FILE};
use accountdb_core::AccountDbContext;

use super::{load_config, DATABASE_FILE};
use crate::output;

const TABLES: &[&str] = &["accountsettings", "transaction_history"];

pub async fn run(json: bool) -> Result<()> {
    let (data_dir, config) = load_config()?;

    let wrote_settings = Config::init_settings(&data_dir, &data_dir.join(DATABASE_FILE))?;

    let database = config
        .database_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());

    let ctx = AccountDbContext::new(config).await?;

    let mut tables = Vec::new();
    for table in TABLES {
        tables.push((*table, ctx.schema.table_exists(table).await?));
    }

    if json {
        let report = json!({
            "database": database,
            "settingsCreated": wrote_settings,
            "tables": tables
                .iter()
                .map(|(name, present)| json!({"name": name, "present": present}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    output::success(&format!("✓ Account store ready at {}", database));
    if wrote_settings {
        output::info(&format!("Wrote {}", data_dir.join(SETTINGS_FILE).display()));
    }
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["Table", "Present"]);
    for (name, present) in &tables {
        table.add_row(vec![name.bold().to_string(), output::yes_no(*present)]);
    }
    println!("{}", table);

    Ok(())
}
