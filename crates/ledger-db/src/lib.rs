//! # ledger-db: Local Ledger Store
//!
//! SQLite persistence for the expense ledger.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          ledger-db                                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Database (pool.rs)                          │   │
//! │  │  ┌─────────────┐                                                │   │
//! │  │  │ SqlitePool  │ ← Connection pool (WAL mode)                   │   │
//! │  │  └──────┬──────┘                                                │   │
//! │  │         │                                                        │   │
//! │  │         ▼                                                        │   │
//! │  │  ┌─────────────────────────────────────────────────────────┐    │   │
//! │  │  │                    Repositories                         │    │   │
//! │  │  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐    │    │   │
//! │  │  │  │ EntryRepo    │ │ CategoryRepo │ │ SettingsRepo │    │    │   │
//! │  │  │  │ ledger +     │ │ icons,       │ │ sheet id,    │    │    │   │
//! │  │  │  │ pending dels │ │ add/remove   │ │ budget       │    │    │   │
//! │  │  │  └──────────────┘ └──────────────┘ └──────────────┘    │    │   │
//! │  │  └─────────────────────────────────────────────────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Migrations (migrations.rs)                     │   │
//! │  │  Embedded SQL files from migrations/sqlite/                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use ledger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./ledger.db")).await?;
//! let entry = db.entries().add(draft).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::category::CategoryRepository;
pub use repository::entry::EntryRepository;
pub use repository::settings::SettingsRepository;
