//! # CLI Commands
//!
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (dispatch)
//! ├── entry.rs     ◄─── add, edit, delete, list
//! ├── report.rs    ◄─── summary, budget
//! ├── category.rs  ◄─── categories
//! └── sync.rs      ◄─── sync, status, auto push after edits
//! ```
//!
//! Each handler takes `&AppState`, prints to stdout and returns
//! `CliResult<()>`. Errors are printed once, by `main`.

pub mod category;
pub mod entry;
pub mod report;
pub mod sync;

use crate::cli::Commands;
use crate::error::CliResult;
use crate::state::AppState;

pub async fn run(state: &AppState, command: Commands) -> CliResult<()> {
    match command {
        Commands::Add {
            amount,
            category,
            entry_type,
            date,
            note,
        } => entry::add(state, amount, category, entry_type, date, note).await,
        Commands::Edit { id, fields } => entry::edit(state, &id, fields).await,
        Commands::Delete { id } => entry::delete(state, &id).await,
        Commands::List {
            month,
            entry_type,
            json,
        } => entry::list(state, month, entry_type, json).await,
        Commands::Summary { month } => report::summary(state, month).await,
        Commands::Budget { action } => report::budget(state, action).await,
        Commands::Categories { action } => category::run(state, action).await,
        Commands::Sync { direction } => sync::run(state, direction.unwrap_or_default()).await,
        Commands::Status => sync::status(state).await,
    }
}
