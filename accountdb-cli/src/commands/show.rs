//! Show command - print an account without its password digest

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

pub async fn run(username: &str, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let account = ctx.accounts.get_by_username(username).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
        return Ok(());
    }

    println!("{}", account.username.bold());
    let mut table = output::create_table();
    table.add_row(vec!["ID".to_string(), account.id.to_string()]);
    table.add_row(vec!["Email".to_string(), account.email.clone()]);
    table.add_row(vec!["Email verified".to_string(), output::yes_no(account.email_verified)]);
    println!("{}", table);

    Ok(())
}
