//! accountdb CLI - account records and transaction history in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{init, login, show, signup, tx, update, verify};

/// accountdb - manage accounts, credentials and transaction history
#[derive(Parser)]
#[command(name = "accountdb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database tables if they are missing
    Init {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new account
    Signup {
        /// Username for the new account
        username: String,
        /// Email address for the new account
        #[arg(long)]
        email: String,
        /// Password (prompted for if omitted)
        #[arg(long, env = "ACCOUNTDB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a username/password pair
    Login {
        /// Username to check
        username: String,
        /// Password (prompted for if omitted)
        #[arg(long, env = "ACCOUNTDB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Mark an account's email as verified
    Verify {
        /// Username to verify
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account
    Show {
        /// Username to show
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change an account's username and/or email
    Update {
        /// Current username
        username: String,
        /// New username
        #[arg(long = "username")]
        new_username: Option<String>,
        /// New email address
        #[arg(long = "email")]
        new_email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record and inspect transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("ACCOUNTDB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { json } => init::run(json).await,
        Commands::Signup { username, email, password, json } => {
            signup::run(&username, &email, password, json).await
        }
        Commands::Login { username, password, json } => login::run(&username, password, json).await,
        Commands::Verify { username, json } => verify::run(&username, json).await,
        Commands::Show { username, json } => show::run(&username, json).await,
        Commands::Update { username, new_username, new_email, json } => {
            update::run(&username, new_username, new_email, json).await
        }
        Commands::Tx { command } => tx::run(command).await,
    }
}
