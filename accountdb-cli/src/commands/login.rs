//! Login command - check a username/password pair

use std::process::exit;

use anyhow::Result;

use super::{get_context, password_or_prompt};
use crate::output;

pub async fn run(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let password = password_or_prompt(password)?;
    let ctx = get_context().await?;

    let result = ctx.credentials.validate(username, &password).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.credentials_valid {
        output::success("✓ Credentials valid");
        if !result.email_verified {
            output::warning(&format!("Email for {} is not verified yet", username));
        }
    } else {
        output::error("✗ Invalid username or password");
    }

    // Rejected credentials exit non-zero
    if !result.credentials_valid {
        exit(1);
    }
    Ok(())
}
