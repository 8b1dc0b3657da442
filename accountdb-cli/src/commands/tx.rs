//! Tx command - record and inspect transaction history

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use accountdb_core::{NewTransaction, TransactionRecord};

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a new transaction (status starts as pending)
    Record {
        /// Client the transaction belongs to
        client_id: String,
        /// Transaction type, e.g. purchase or transfer
        #[arg(long = "type")]
        transaction_type: String,
        /// Items sent, as a JSON document
        #[arg(long)]
        sent: Option<String>,
        /// Items received, as a JSON document
        #[arg(long)]
        received: Option<String>,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a client's transactions, oldest first
    List {
        /// Client to list
        client_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transaction
    Show {
        /// Transaction ID
        id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(command: TxCommands) -> Result<()> {
    match command {
        TxCommands::Record { client_id, transaction_type, sent, received, notes, json } => {
            let mut tx = NewTransaction::new(client_id, transaction_type);
            if let Some(sent) = sent {
                tx = tx.with_items_sent(parse_document("--sent", &sent)?);
            }
            if let Some(received) = received {
                tx = tx.with_items_received(parse_document("--received", &received)?);
            }
            if let Some(notes) = notes {
                tx = tx.with_notes(notes);
            }
            record(&tx, json).await
        }
        TxCommands::List { client_id, json } => list(&client_id, json).await,
        TxCommands::Show { id, json } => show(id, json).await,
    }
}

fn parse_document(flag: &str, raw: &str) -> Result<JsonValue> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON: {}", flag, raw))
}

async fn record(tx: &NewTransaction, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let transaction_id = ctx.transactions.record(tx).await?;

    if json {
        println!("{}", serde_json::json!({"transactionId": transaction_id}));
        return Ok(());
    }

    output::success(&format!("✓ Recorded transaction {}", transaction_id));
    Ok(())
}

async fn list(client_id: &str, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let transactions = ctx.transactions.list_for_client(client_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        output::info(&format!("No transactions for {}", client_id));
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Type", "Status", "Sent", "Received", "Notes"]);
    for tx in &transactions {
        table.add_row(vec![
            tx.transaction_id.to_string(),
            tx.transaction_type.clone(),
            tx.status.clone(),
            compact_document(&tx.items_sent),
            compact_document(&tx.items_received),
            tx.notes.clone().unwrap_or_default(),
        ]);
    }
    println!("{}", table);
    println!("{} transaction(s)", transactions.len());

    Ok(())
}

async fn show(transaction_id: Uuid, json: bool) -> Result<()> {
    let ctx = get_context().await?;
    let tx = ctx.transactions.get(transaction_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
        return Ok(());
    }

    print_transaction(&tx);
    Ok(())
}

fn print_transaction(tx: &TransactionRecord) {
    println!("{}", tx.transaction_id.to_string().bold());
    let mut table = output::create_table();
    table.add_row(vec!["Client".to_string(), tx.client_id.clone()]);
    table.add_row(vec!["Type".to_string(), tx.transaction_type.clone()]);
    table.add_row(vec!["Status".to_string(), tx.status.clone()]);
    table.add_row(vec!["Sent".to_string(), compact_document(&tx.items_sent)]);
    table.add_row(vec!["Received".to_string(), compact_document(&tx.items_received)]);
    table.add_row(vec!["Notes".to_string(), tx.notes.clone().unwrap_or_default()]);
    println!("{}", table);
}

fn compact_document(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
