//! Verify command - mark an account's email as verified

use anyhow::Result;
use serde_json::json;

use super::get_context;
use crate::output;

pub async fn run(username: &str, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    ctx.accounts.mark_email_verified(username).await?;

    if json {
        println!("{}", json!({"username": username, "emailVerified": true}));
        return Ok(());
    }

    output::success(&format!("✓ Email verified for {}", username));
    Ok(())
}
