//! Table definitions - embedded SQL files
//!
//! Each file is compiled in with `include_str!` and may hold several
//! `;`-separated statements. Every statement uses `IF NOT EXISTS`, so the
//! whole set can be replayed on every startup. There is no version table:
//! a file is never edited in place once released, only added.

/// All schema files in application order.
/// Format: (filename, sql_content)
pub const SCHEMA: &[(&str, &str)] = &[
    ("001_accountsettings.sql", include_str!("001_accountsettings.sql")),
    ("002_transaction_history.sql", include_str!("002_transaction_history.sql")),
];

/// Split a schema file into individual statements, dropping `--` comments
pub fn statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .map(|line| match line.find("--") {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
        .map(str::to_string)
        .collect()
}
