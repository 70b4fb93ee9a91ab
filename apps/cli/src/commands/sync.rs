//! # Sync Commands
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Commands                                    │
//! │                                                                         │
//! │  ledger sync [pull|push|full]  - Run one reconciliation cycle          │
//! │  ledger status                 - Local counts and sheet link           │
//! │  push_after_edit()             - Auto push after add/edit/delete       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Engine events are printed to stderr while a cycle runs, so stdout only
//! carries the result.

use std::future::Future;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::debug;

use ledger_sync::{
    CredentialProvider, FullSyncReport, PullReport, PushReport, SyncEvent, SyncOutcome,
};

use crate::cli::SyncDirection;
use crate::error::CliResult;
use crate::state::AppState;

pub async fn run(state: &AppState, direction: SyncDirection) -> CliResult<()> {
    state.require_sync()?;
    let engine = &state.engine;

    match direction {
        SyncDirection::Pull => {
            let report = with_live_events(state, engine.sync_from_sheet())
                .await
                .into_result()?;
            print_pull(&report);
        }
        SyncDirection::Push => {
            let report = with_live_events(state, engine.sync_to_sheet())
                .await
                .into_result()?;
            print_push(&report);
        }
        SyncDirection::Full => {
            let report = with_live_events(state, engine.full_sync())
                .await
                .into_result()?;
            print_full(&report);
        }
    }

    if let Some(url) = state.engine.spreadsheet_url().await? {
        println!("Sheet: {}", url);
    }
    Ok(())
}

pub async fn status(state: &AppState) -> CliResult<()> {
    let entries = state.db.entries();
    let total = entries.count().await?;
    let unsynced = entries.count_unsynced().await?;
    let pending = entries.pending_deletions().await?.len();

    println!("Entries:            {}", total);
    println!("Not yet on sheet:   {}", unsynced);
    println!("Deletions queued:   {}", pending);
    println!("Sync mode:          {}", state.config.mode());
    if !state.sync_enabled() {
        println!("Sync:               off");
    }
    println!(
        "Signed in:          {}",
        if state.credentials.is_authenticated() { "yes" } else { "no" }
    );
    match state.engine.spreadsheet_url().await? {
        Some(url) => println!("Sheet:              {}", url),
        None => println!("Sheet:              none yet"),
    }
    if let Some(err) = state.engine.last_error().await {
        println!("Last error:         {}", err);
    }
    Ok(())
}

/// Pushes local edits when auto push is on. Failures only warn: the edit is
/// already saved and the next sync picks it up.
pub async fn push_after_edit(state: &AppState) {
    if !state.should_auto_push() {
        debug!("Auto push skipped");
        return;
    }

    match with_live_events(state, state.engine.push_after_edit()).await {
        SyncOutcome::Completed(report) if !report.is_noop() => print_push(&report),
        SyncOutcome::Completed(_) => {}
        SyncOutcome::Failed(err) => {
            eprintln!("warning: saved locally, push failed: {}", err);
        }
    }
}

/// Drives `cycle` while printing engine events to stderr.
async fn with_live_events<F: Future>(state: &AppState, cycle: F) -> F::Output {
    let mut events = state.engine.subscribe();
    tokio::pin!(cycle);

    let finished = loop {
        tokio::select! {
            output = &mut cycle => break Some(output),
            received = events.recv() => match received {
                Ok(event) => eprintln!("sync {}", event),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Dropped sync events"),
                Err(RecvError::Closed) => break None,
            },
        }
    };
    let output = match finished {
        Some(output) => output,
        None => cycle.await,
    };

    print_remaining(&mut events);
    output
}

fn print_remaining(events: &mut Receiver<SyncEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => eprintln!("sync {}", event),
            Err(TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Dropped sync events");
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

fn print_pull(report: &PullReport) {
    if report.created_table {
        println!("Created spreadsheet {}", report.table_id);
    }
    println!("Pulled: {} new, {} removed", report.added, report.removed);
}

fn print_push(report: &PushReport) {
    if report.is_noop() {
        println!("Pushed: nothing to send");
        return;
    }
    println!(
        "Pushed: {} updated, {} appended, {} deleted",
        report.updated,
        report.appended,
        report.deleted + report.cleared_missing
    );
}

fn print_full(report: &FullSyncReport) {
    print_pull(&report.pull);
    print_push(&report.push);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CliError, ExitCode};
    use ledger_db::{Database, DbConfig};
    use ledger_sync::{LedgerConfig, SyncError};

    async fn state(offline: bool) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::with_database(LedgerConfig::default(), db, offline).unwrap()
    }

    #[tokio::test]
    async fn test_sync_refused_offline() {
        let state = state(true).await;
        let err = run(&state, SyncDirection::Full).await.unwrap_err();
        assert!(matches!(err, CliError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_sync_without_token_is_sync_failure() {
        let state = state(false).await;
        let err = run(&state, SyncDirection::Pull).await.unwrap_err();
        assert!(matches!(err, CliError::Sync(SyncError::Unauthenticated)));
        assert_eq!(err.exit_code(), ExitCode::Sync);
        assert!(state.engine.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_auto_push_skipped_without_token() {
        let state = state(false).await;
        push_after_edit(&state).await;
        assert!(state.engine.last_error().await.is_none());
    }
}
