//! # ledger: Expense Ledger CLI
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Startup Sequence                                 │
//! │                                                                         │
//! │  1. Initialize tracing (RUST_LOG, default info)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  2. Parse arguments (clap)                                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. Load config: TOML file ─► LEDGER_* env overrides ─► validate       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  4. Open SQLite ledger, run migrations                                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  5. Wire SyncEngine (SheetsClient + session credentials)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  6. Run the command, exit with its code                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Logs go to stderr; command output goes to stdout.

mod cli;
mod commands;
mod error;
mod state;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::state::AppState;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "ledger starting");

    let result = async move {
        let state = AppState::open(cli.config, cli.offline).await?;
        let outcome = commands::run(&state, cli.command).await;
        state.db.close().await;
        outcome
    }
    .await;

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {}", e);
            std::process::ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
