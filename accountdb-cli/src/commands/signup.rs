//! Signup command - create a new account

use anyhow::Result;
use serde_json::json;

use super::{get_context, new_password_or_prompt};
use crate::output;

pub async fn run(username: &str, email: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = new_password_or_prompt(password)?;
    let ctx = get_context().await?;

    let account_id = ctx
        .accounts
        .create_with_password(username, &password, email)
        .await?;

    if json {
        let created = json!({
            "accountId": account_id,
            "username": username,
            "email": email,
        });
        println!("{}", serde_json::to_string_pretty(&created)?);
        return Ok(());
    }

    output::success(&format!("✓ Created account {} (id {})", username, account_id));
    Ok(())
}
