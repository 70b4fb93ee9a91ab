//! # Domain Types
//!
//! Core domain types used throughout the ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Entry       │   │   EntryDraft    │   │   EntryPatch    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  date           │   │  date?          │       │
//! │  │  date           │   │  entry_type     │   │  entry_type?    │       │
//! │  │  entry_type     │   │  category       │   │  category?      │       │
//! │  │  category       │   │  amount         │   │  amount?        │       │
//! │  │  amount         │   │  note?          │   │  note?          │       │
//! │  │  note           │   └─────────────────┘   └─────────────────┘       │
//! │  │  created_at     │                                                    │
//! │  │  synced         │   ┌─────────────────┐   ┌─────────────────┐       │
//! │  └─────────────────┘   │   EntryType     │   │   YearMonth     │       │
//! │                        │  Expense (支出) │   │  2024-03        │       │
//! │                        │  Income  (收入) │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! `Entry::id` is generated on the device that created the entry and is the
//! only join key between the local ledger and the spreadsheet. It is treated
//! as opaque text: rows created by older clients may carry non-UUID ids.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::Money;

/// Date format used for entry dates everywhere (store, sheet, CLI).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Entry Type
// =============================================================================

/// Whether an entry is money going out or coming in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Expense,
    Income,
}

impl EntryType {
    /// Spreadsheet label for expenses.
    pub const EXPENSE_LABEL: &'static str = "支出";
    /// Spreadsheet label for income.
    pub const INCOME_LABEL: &'static str = "收入";

    /// Machine name as stored in SQLite (`expense` / `income`).
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Expense => "expense",
            EntryType::Income => "income",
        }
    }

    /// Human label written to the spreadsheet's type column.
    pub fn label(&self) -> &'static str {
        match self {
            EntryType::Expense => Self::EXPENSE_LABEL,
            EntryType::Income => Self::INCOME_LABEL,
        }
    }

    /// Reads a spreadsheet type label.
    ///
    /// Only the income label maps to `Income`; anything else, including an
    /// empty or hand-edited cell, is an expense.
    pub fn from_label(label: &str) -> EntryType {
        if label.trim() == Self::INCOME_LABEL {
            EntryType::Income
        } else {
            EntryType::Expense
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "expense" => Ok(EntryType::Expense),
            "income" => Ok(EntryType::Income),
            _ => match s.trim() {
                Self::EXPENSE_LABEL => Ok(EntryType::Expense),
                Self::INCOME_LABEL => Ok(EntryType::Income),
                other => Err(CoreError::UnknownEntryType(other.to_string())),
            },
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// A single ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Client-generated identifier, stable for the entry's lifetime.
    pub id: String,

    /// Calendar date the money moved (no time component).
    pub date: NaiveDate,

    pub entry_type: EntryType,

    /// Free-form category label; expected to match a known category.
    pub category: String,

    /// Non-negative amount.
    pub amount: Money,

    /// Optional note, empty string when absent.
    pub note: String,

    /// When the entry was first created locally. Tie-break within a date.
    pub created_at: DateTime<Utc>,

    /// True iff the local copy is believed identical to a remote row.
    pub synced: bool,
}

impl Entry {
    /// Builds a brand-new unsynced entry from a draft.
    ///
    /// Assigns a fresh UUID v4 and `created_at = now`. Validation is the
    /// caller's job (see [`crate::validation::validate_draft`]).
    pub fn from_draft(draft: EntryDraft) -> Self {
        Entry {
            id: uuid::Uuid::new_v4().to_string(),
            date: draft.date,
            entry_type: draft.entry_type,
            category: draft.category.trim().to_string(),
            amount: draft.amount,
            note: draft.note.unwrap_or_default(),
            created_at: Utc::now(),
            synced: false,
        }
    }

    /// Applies a partial update. Always resets `synced`.
    pub fn apply_patch(&mut self, patch: EntryPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(entry_type) = patch.entry_type {
            self.entry_type = entry_type;
        }
        if let Some(category) = patch.category {
            self.category = category.trim().to_string();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(note) = patch.note {
            self.note = note;
        }
        self.synced = false;
    }

    /// Amount with sign applied: income positive, expense negative.
    pub fn signed_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Income => self.amount,
            EntryType::Expense => Money::zero() - self.amount,
        }
    }
}

// =============================================================================
// Draft / Patch
// =============================================================================

/// Input for creating an entry.
///
/// This is also the output contract of any structured-input front end
/// (a form, a voice parser): whatever produces an entry produces a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub date: NaiveDate,
    pub entry_type: EntryType,
    pub category: String,
    pub amount: Money,
    pub note: Option<String>,
}

/// Partial update for an existing entry. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub date: Option<NaiveDate>,
    pub entry_type: Option<EntryType>,
    pub category: Option<String>,
    pub amount: Option<Money>,
    pub note: Option<String>,
}

impl EntryPatch {
    /// True when the patch would change nothing but the sync flag.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.entry_type.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.note.is_none()
    }
}

// =============================================================================
// Year / Month
// =============================================================================

/// A calendar month. Year and month travel together: a filter either has
/// both or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a month, rejecting month numbers outside 1-12.
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(CoreError::InvalidMonth(format!("{year}-{month:02}")));
        }
        Ok(YearMonth { year, month })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current month in UTC.
    pub fn current() -> Self {
        Self::of(Utc::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1-12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of this month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive upper bound).
    pub fn next_month_first_day(&self) -> NaiveDate {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CoreError;

    /// Parses `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

/// Parses an entry date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, CoreError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| CoreError::InvalidDate(s.to_string()))
}

// =============================================================================
// Filter
// =============================================================================

/// Listing filter: optional month and optional type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub month: Option<YearMonth>,
    pub entry_type: Option<EntryType>,
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.month.map_or(true, |m| m.contains(entry.date))
            && self.entry_type.map_or(true, |t| t == entry.entry_type)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> EntryDraft {
        EntryDraft {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            entry_type: EntryType::Expense,
            category: " 飲食 ".to_string(),
            amount: Money::from_cents(12000),
            note: None,
        }
    }

    #[test]
    fn test_entry_type_labels() {
        assert_eq!(EntryType::Income.label(), "收入");
        assert_eq!(EntryType::Expense.label(), "支出");
        assert_eq!(EntryType::from_label("收入"), EntryType::Income);
        assert_eq!(EntryType::from_label(" 收入 "), EntryType::Income);
        assert_eq!(EntryType::from_label("支出"), EntryType::Expense);
        assert_eq!(EntryType::from_label("???"), EntryType::Expense);
    }

    #[test]
    fn test_entry_type_from_str() {
        assert_eq!("income".parse::<EntryType>().unwrap(), EntryType::Income);
        assert_eq!("Expense".parse::<EntryType>().unwrap(), EntryType::Expense);
        assert_eq!("收入".parse::<EntryType>().unwrap(), EntryType::Income);
        assert!("refund".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_entry_type_serde_lowercase() {
        let json = serde_json::to_string(&EntryType::Income).unwrap();
        assert_eq!(json, "\"income\"");
        let back: EntryType = serde_json::from_str("\"expense\"").unwrap();
        assert_eq!(back, EntryType::Expense);
    }

    #[test]
    fn test_from_draft_assigns_identity() {
        let a = Entry::from_draft(draft());
        let b = Entry::from_draft(draft());

        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
        assert_eq!(a.category, "飲食");
        assert_eq!(a.note, "");
        assert!(!a.synced);
    }

    #[test]
    fn test_apply_patch_resets_synced() {
        let mut entry = Entry::from_draft(draft());
        entry.synced = true;

        entry.apply_patch(EntryPatch {
            amount: Some(Money::from_cents(9900)),
            note: Some("dinner".to_string()),
            ..Default::default()
        });

        assert_eq!(entry.amount.cents(), 9900);
        assert_eq!(entry.note, "dinner");
        assert_eq!(entry.category, "飲食");
        assert!(!entry.synced);
    }

    #[test]
    fn test_signed_amount() {
        let mut entry = Entry::from_draft(draft());
        assert_eq!(entry.signed_amount().cents(), -12000);
        entry.entry_type = EntryType::Income;
        assert_eq!(entry.signed_amount().cents(), 12000);
    }

    #[test]
    fn test_year_month_parse_and_bounds() {
        let ym: YearMonth = "2024-12".parse().unwrap();
        assert_eq!(ym.year(), 2024);
        assert_eq!(ym.month(), 12);
        assert_eq!(ym.to_string(), "2024-12");
        assert_eq!(ym.first_day(), NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(
            ym.next_month_first_day(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-00".parse::<YearMonth>().is_err());
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let entry = Entry::from_draft(draft());
        let march = YearMonth::new(2024, 3).unwrap();
        let april = YearMonth::new(2024, 4).unwrap();

        assert!(EntryFilter::default().matches(&entry));
        assert!(EntryFilter {
            month: Some(march),
            entry_type: Some(EntryType::Expense)
        }
        .matches(&entry));
        assert!(!EntryFilter {
            month: Some(april),
            entry_type: None
        }
        .matches(&entry));
        assert!(!EntryFilter {
            month: None,
            entry_type: Some(EntryType::Income)
        }
        .matches(&entry));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-02-29 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }
}
