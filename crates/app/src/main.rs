//! Tally CLI
//!
//! Usage:
//!   tally import statement.ofx     Import a statement (account created on first import)
//!   tally rule add dominos Pizza   Tag matching transactions
//!   tally budget --start 2024-01   Spent vs budgeted per tag

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tally::{Ledger, Settings};
use tally_storage::SqliteStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    // Priority: RUST_LOG env var > --verbose flag > configured level
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&settings.log.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => settings.database_path()?,
    };
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }

    let store = SqliteStore::open(&db_path)
        .await
        .with_context(|| format!("open database {}", db_path.display()))?;
    let ledger = Ledger::new(store, settings.report.clone());

    commands::run(&ledger, cli.command).await
}
