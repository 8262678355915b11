//! MedLedger CLI: read-side and retrieval operations
//!
//! Uploads need a connected wallet to sign, so they go through the library
//! API; this binary covers listing, stats, gateway fetch, and gateway
//! diagnostics.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use medledger_node::config::AppConfig;
use medledger_node::ledger::{
    EntryCall, LedgerError, RestLedgerClient, SubmittedCall, TransactionSigner,
};
use medledger_node::local_state::JsonFileStore;
use medledger_node::storage::retrieval::suggested_file_name;
use medledger_node::view::RecordCatalog;
use medledger_node::{RefreshBus, RetrievalResolver};

#[derive(Parser)]
#[command(name = "medledger", about = "MedLedger record client", version)]
struct Cli {
    /// Path to a YAML config file; defaults come from the environment
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List records visible to an account
    Records {
        /// Ledger address of the account
        owner: String,
        /// Include locally hidden records
        #[arg(long)]
        all: bool,
    },
    /// Show account and ledger-wide aggregates
    Stats { owner: String },
    /// Fetch a content reference through the gateway fallback chain
    Fetch {
        content_ref: String,
        /// Output path; derived from the response when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Probe every configured gateway for a content reference
    Validate { content_ref: String },
}

/// This binary has no wallet attached, so any write attempt is an error
struct NoWalletSigner;

#[async_trait]
impl TransactionSigner for NoWalletSigner {
    async fn sign_and_submit(&self, _call: &EntryCall) -> Result<SubmittedCall, LedgerError> {
        Err(LedgerError::Submission(
            "no wallet signer attached; uploads require a connected wallet".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env(),
    };

    match cli.command {
        Command::Records { owner, all } => {
            let catalog = catalog(&config)?;
            let records = if all {
                catalog.records(&owner).await?
            } else {
                catalog.visible_records(&owner).await?
            };
            if records.is_empty() {
                println!("no records");
                return Ok(());
            }
            for record in records {
                println!(
                    "{}  {}  {:?}  {}",
                    record.timestamp,
                    record.owner_id,
                    record.content_kind(),
                    record.content_ref
                );
                println!("    symptoms:  {}", record.symptoms);
                println!("    diagnosis: {}", record.diagnosis);
            }
        }
        Command::Stats { owner } => {
            let catalog = catalog(&config)?;
            let account = catalog.account_stats(&owner).await?;
            let ledger = catalog.ledger_stats(&owner).await?;
            println!(
                "account: {} records, last upload {}",
                account.total_records,
                account.last_upload.as_deref().unwrap_or("never")
            );
            println!(
                "ledger:  {} records across {} accounts",
                ledger.total_records, ledger.total_accounts
            );
        }
        Command::Fetch { content_ref, output } => {
            let resolver = RetrievalResolver::from_config(&config.retrieval)
                .map_err(|e| anyhow!("retrieval setup failed: {}", e.message))?;
            let content = resolver.resolve(&content_ref).await?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(suggested_file_name(&content, &content_ref)));
            std::fs::write(&path, &content.bytes)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "fetched {} bytes ({}) via {} -> {}",
                content.bytes.len(),
                content.content_type,
                content.gateway,
                path.display()
            );
        }
        Command::Validate { content_ref } => {
            let resolver = RetrievalResolver::from_config(&config.retrieval)
                .map_err(|e| anyhow!("retrieval setup failed: {}", e.message))?;
            let report = resolver.validate(&content_ref).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn catalog(config: &AppConfig) -> Result<RecordCatalog> {
    let ledger = RestLedgerClient::new(&config.ledger, Arc::new(NoWalletSigner))?;
    let local = JsonFileStore::open(PathBuf::from(&config.local_state.path));
    Ok(RecordCatalog::new(
        Arc::new(ledger),
        Arc::new(local),
        RefreshBus::default(),
        config.ledger.clone(),
    ))
}
