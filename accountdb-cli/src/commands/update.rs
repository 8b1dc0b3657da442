//! Update command - change username and/or email

use anyhow::Result;
use serde_json::json;

use accountdb_core::AccountUpdate;

use super::get_context;
use crate::output;

pub async fn run(
    username: &str,
    new_username: Option<String>,
    new_email: Option<String>,
    json: bool,
) -> Result<()> {
    let update = AccountUpdate::new(new_username, new_email);
    let ctx = get_context().await?;

    ctx.accounts.update(username, &update).await?;

    if json {
        let result = json!({
            "username": update.new_username.as_deref().unwrap_or(username),
            "changed": !update.is_empty(),
            "update": update,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if update.is_empty() {
        output::warning("Nothing to update. Pass --username and/or --email.");
        return Ok(());
    }

    if let Some(new_username) = &update.new_username {
        output::success(&format!("✓ Renamed {} to {}", username, new_username));
    }
    if let Some(new_email) = &update.new_email {
        output::success(&format!("✓ Email changed to {}", new_email));
    }
    Ok(())
}
