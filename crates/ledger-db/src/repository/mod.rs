//! # Repository Module
//!
//! Database repository implementations for the ledger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CLI command / SyncEngine                                               │
//! │       │                                                                 │
//! │       │  db.entries().list_unsynced()                                  │
//! │       ▼                                                                 │
//! │  EntryRepository                                                       │
//! │  ├── add / update / delete          (local edits)                      │
//! │  ├── list_filtered / month_summary  (reads)                            │
//! │  └── merge / mark_synced / ...      (reconciliation support)           │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`EntryRepository`](entry::EntryRepository) - Ledger entries and pending deletions
//! - [`CategoryRepository`](category::CategoryRepository) - Categories and icons
//! - [`SettingsRepository`](settings::SettingsRepository) - Sheet id and budget

pub mod category;
pub mod entry;
pub mod settings;
