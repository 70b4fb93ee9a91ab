//! # ledger-sync: Spreadsheet Reconciliation
//!
//! Mirrors the local ledger to a Google Sheets spreadsheet and back.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ledger-sync                                    │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                     SyncEngine (engine)                          │  │
//! │  │                                                                  │  │
//! │  │  pull then push, one cycle at a time                             │  │
//! │  │  publishes SyncEvent on a broadcast channel                      │  │
//! │  └──────────────┬───────────────────────────────┬───────────────────┘  │
//! │                 │                               │                       │
//! │                 ▼                               ▼                       │
//! │  ┌──────────────────────────────┐  ┌───────────────────────────────┐   │
//! │  │  RemoteTable (remote)        │  │  ledger_db::Database          │   │
//! │  │  └── SheetsClient (sheets)   │  │  entries, pending deletions,  │   │
//! │  │      rows via codec (row)    │  │  sheet id                     │   │
//! │  └──────────────────────────────┘  └───────────────────────────────┘   │
//! │                                                                         │
//! │  LedgerConfig (config)        CredentialProvider (credentials)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - TOML + environment configuration
//! - [`credentials`] - Bearer token provider and in-memory session
//! - [`engine`] - The reconciliation engine
//! - [`error`] - Sync error types
//! - [`events`] - Status and data-changed events
//! - [`remote`] - The `RemoteTable` trait
//! - [`row`] - Entry ⇄ sheet row codec
//! - [`sheets`] - Google Sheets v4 REST client
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ledger_sync::{LedgerConfig, SessionCredentials, SheetsClient, SyncEngine};
//!
//! let config = LedgerConfig::load_or_default(None);
//! let remote = Arc::new(SheetsClient::new(&config.sheets)?);
//! let credentials = Arc::new(SessionCredentials::from_config(&config));
//! let engine = SyncEngine::new(database, remote, credentials);
//!
//! let mut events = engine.subscribe();
//! match engine.full_sync().await {
//!     SyncOutcome::Completed(report) => println!("pulled {}", report.pull.added),
//!     SyncOutcome::Failed(err) => eprintln!("sync failed: {}", err),
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod events;
pub mod remote;
pub mod row;
pub mod sheets;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{LedgerConfig, SheetsSettings, StorageSettings, SyncMode, SyncSettings};
pub use credentials::{CredentialProvider, SessionCredentials};
pub use engine::{FullSyncReport, PullReport, PushReport, SyncEngine, SyncOutcome};
pub use error::{SyncError, SyncResult};
pub use events::{EngineState, SyncEvent, SyncStatus};
pub use remote::RemoteTable;
pub use sheets::SheetsClient;
