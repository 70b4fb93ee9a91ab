//! # Validation Module
//!
//! Input validation for entries and categories.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI (clap)                                                   │
//! │  ├── Type parsing (dates, amounts, entry types)                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rules (non-empty, lengths, non-negative)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── PRIMARY KEY on entry id                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows arriving from the spreadsheet do NOT pass through here: remote data
//! is tolerated as-is (see the row codec in `ledger-sync`).

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{EntryDraft, EntryPatch};
use crate::{MAX_CATEGORY_LENGTH, MAX_NOTE_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a category label.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 50 characters
///
/// ## Example
/// ```rust
/// use ledger_core::validation::validate_category;
///
/// assert!(validate_category("飲食").is_ok());
/// assert!(validate_category("  ").is_err());
/// ```
pub fn validate_category(category: &str) -> ValidationResult<()> {
    let category = category.trim();

    if category.is_empty() {
        return Err(ValidationError::Required {
            field: "category".to_string(),
        });
    }

    if category.chars().count() > MAX_CATEGORY_LENGTH {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max: MAX_CATEGORY_LENGTH,
        });
    }

    Ok(())
}

/// Validates a note (may be empty).
pub fn validate_note(note: &str) -> ValidationResult<()> {
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }
    Ok(())
}

/// Validates an entry amount. Zero is allowed.
pub fn validate_amount(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "amount".to_string(),
        });
    }
    Ok(())
}

/// Validates an entry id supplied by a caller.
pub fn validate_entry_id(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every field of a new entry.
pub fn validate_draft(draft: &EntryDraft) -> ValidationResult<()> {
    validate_category(&draft.category)?;
    validate_amount(draft.amount)?;
    if let Some(note) = &draft.note {
        validate_note(note)?;
    }
    Ok(())
}

/// Validates the fields a patch sets.
pub fn validate_patch(patch: &EntryPatch) -> ValidationResult<()> {
    if let Some(category) = &patch.category {
        validate_category(category)?;
    }
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }
    if let Some(note) = &patch.note {
        validate_note(note)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryType;
    use chrono::NaiveDate;

    fn draft() -> EntryDraft {
        EntryDraft {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            entry_type: EntryType::Expense,
            category: "交通".to_string(),
            amount: Money::from_cents(3000),
            note: Some("捷運".to_string()),
        }
    }

    #[test]
    fn test_validate_category() {
        assert!(validate_category("飲食").is_ok());
        assert!(validate_category("").is_err());
        assert!(validate_category("   ").is_err());
        // 50 multi-byte characters are fine, 51 are not
        assert!(validate_category(&"食".repeat(50)).is_ok());
        assert!(validate_category(&"食".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Money::zero()).is_ok());
        assert!(validate_amount(Money::from_cents(1)).is_ok());
        assert!(matches!(
            validate_amount(Money::from_cents(-1)),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
    }

    #[test]
    fn test_validate_note() {
        assert!(validate_note("").is_ok());
        assert!(validate_note(&"a".repeat(500)).is_ok());
        assert!(validate_note(&"a".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_draft() {
        assert!(validate_draft(&draft()).is_ok());

        let mut bad = draft();
        bad.category = String::new();
        assert!(validate_draft(&bad).is_err());

        let mut bad = draft();
        bad.amount = Money::from_cents(-500);
        assert!(validate_draft(&bad).is_err());
    }

    #[test]
    fn test_validate_patch_checks_only_set_fields() {
        assert!(validate_patch(&EntryPatch::default()).is_ok());
        assert!(validate_patch(&EntryPatch {
            category: Some(" ".to_string()),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_validate_entry_id() {
        assert!(validate_entry_id("abc").is_ok());
        assert!(validate_entry_id("  ").is_err());
    }
}
