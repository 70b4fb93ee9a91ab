//! # ledger-core: Pure Domain Logic for the Expense Ledger
//!
//! This crate holds every rule about ledger entries that does not need I/O:
//! the entry model, integer money, categories, budget evaluation and input
//! validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Expense Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/cli (`ledger`)                          │   │
//! │  │    add ──► list ──► summary ──► sync                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  ledger-sync (reconciliation)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  ledger-db (SQLite ledger)                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledger-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  budget   │  │ validation│  │   │
//! │  │   │  Entry    │  │   Money   │  │  Status   │  │   rules   │  │   │
//! │  │   │  Draft    │  │  parsing  │  │  Summary  │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entry, EntryDraft, EntryPatch, EntryType, YearMonth
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`category`] - Default categories and icons
//! - [`budget`] - Monthly summary and budget evaluation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use ledger_core::money::Money;
//!
//! let amount = Money::parse_decimal("1,250.5").unwrap();
//! assert_eq!(amount.cents(), 125050);
//! assert_eq!(amount.to_decimal_string(), "1250.50");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod budget;
pub mod category;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use budget::{BudgetStatus, MonthSummary};
pub use category::Category;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a category label (characters).
pub const MAX_CATEGORY_LENGTH: usize = 50;

/// Maximum length of a free-text note (characters).
pub const MAX_NOTE_LENGTH: usize = 500;
