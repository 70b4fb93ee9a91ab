//! # Entry Commands
//!
//! `add`, `edit`, `delete` and `list`. Edits land in the local ledger first;
//! with `auto_push` on they are then pushed, and a failed push only warns.

use chrono::{Local, NaiveDate};

use ledger_core::{Entry, EntryDraft, EntryFilter, EntryPatch, EntryType, Money, YearMonth};

use crate::cli::EditFields;
use crate::commands::sync::push_after_edit;
use crate::error::{CliError, CliResult};
use crate::state::AppState;

pub async fn add(
    state: &AppState,
    amount: Money,
    category: String,
    entry_type: EntryType,
    date: Option<NaiveDate>,
    note: Option<String>,
) -> CliResult<()> {
    let draft = EntryDraft {
        date: date.unwrap_or_else(|| Local::now().date_naive()),
        entry_type,
        category,
        amount,
        note,
    };

    let entry = state.db.entries().add(draft).await?;
    let icon = state.db.categories().icon_for(&entry.category).await?;
    println!("Added {}", describe(&entry, &icon));
    println!("  id: {}", entry.id);

    push_after_edit(state).await;
    Ok(())
}

pub async fn edit(state: &AppState, id: &str, fields: EditFields) -> CliResult<()> {
    let patch = EntryPatch {
        date: fields.date,
        entry_type: fields.entry_type,
        category: fields.category,
        amount: fields.amount,
        note: fields.note,
    };

    let entry = state.db.entries().update(id, patch).await?;
    let icon = state.db.categories().icon_for(&entry.category).await?;
    println!("Updated {}", describe(&entry, &icon));

    push_after_edit(state).await;
    Ok(())
}

pub async fn delete(state: &AppState, id: &str) -> CliResult<()> {
    if !state.db.entries().delete(id).await? {
        return Err(CliError::NotFound {
            entity: "Entry".into(),
            id: id.to_string(),
        });
    }
    println!("Deleted {}", id);

    push_after_edit(state).await;
    Ok(())
}

pub async fn list(
    state: &AppState,
    month: Option<YearMonth>,
    entry_type: Option<EntryType>,
    json: bool,
) -> CliResult<()> {
    let entries = state
        .db
        .entries()
        .list_filtered(EntryFilter { month, entry_type })
        .await?;

    if json {
        let text = serde_json::to_string_pretty(&entries)
            .map_err(|e| CliError::invalid(format!("cannot encode entries: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    let categories = state.db.categories().list().await?;
    for entry in &entries {
        let icon = ledger_core::category::icon_for(&categories, &entry.category);
        let marker = if entry.synced { ' ' } else { '*' };
        println!("{} {}  {}", marker, short_id(&entry.id), describe(entry, icon));
    }

    let unsynced = entries.iter().filter(|e| !e.synced).count();
    if unsynced > 0 {
        println!();
        println!("* {} not yet on the sheet", unsynced);
    }
    Ok(())
}

/// One-line rendering: `2024-03-01  🍔 飲食  -$120.50  lunch`.
fn describe(entry: &Entry, icon: &str) -> String {
    let mut line = format!(
        "{}  {} {}  {}",
        entry.date,
        icon,
        entry.category,
        entry.signed_amount()
    );
    if !entry.note.is_empty() {
        line.push_str("  ");
        line.push_str(&entry.note);
    }
    line
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(note: &str) -> Entry {
        Entry {
            id: "0f8e2c5a-1111-2222-3333-444455556666".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            entry_type: EntryType::Expense,
            category: "飲食".into(),
            amount: Money::from_cents(12050),
            note: note.into(),
            created_at: Utc::now(),
            synced: false,
        }
    }

    #[test]
    fn test_describe_includes_note_only_when_present() {
        let with_note = describe(&entry("午餐"), "🍔");
        assert!(with_note.starts_with("2024-03-01  🍔 飲食"));
        assert!(with_note.ends_with("午餐"));

        let plain = describe(&entry(""), "🍔");
        assert!(!plain.ends_with("  "));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f8e2c5a-1111"), "0f8e2c5a");
        assert_eq!(short_id("abc"), "abc");
    }
}
