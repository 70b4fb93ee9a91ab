//! # Entry Repository
//!
//! The local ledger: entries plus the pending-deletions set.
//!
//! ## Sync Flag Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   add / update ──────────────► synced = 0                               │
//! │                                   │                                     │
//! │                                   │  push writes the row                │
//! │                                   ▼                                     │
//! │   merge (from sheet) ────────► synced = 1 ◄── mark_synced / mark_pushed │
//! │                                   │                                     │
//! │                                   │  row vanished from the sheet        │
//! │                                   ▼                                     │
//! │                           remove_local_only                             │
//! │                                                                         │
//! │   delete ──► row removed + id recorded in pending_deletions             │
//! │              (cleared only once the sheet no longer has the row)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every public operation is a single statement or a single transaction,
//! so the sync engine never observes a half-applied change.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use ledger_core::validation::{validate_draft, validate_entry_id, validate_patch};
use ledger_core::{
    Entry, EntryDraft, EntryFilter, EntryPatch, EntryType, Money, MonthSummary, YearMonth,
    DATE_FORMAT,
};

const SELECT_ENTRY: &str = r#"
    SELECT id, date, entry_type, category, amount_cents, note, created_at, synced
    FROM entries
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    date: String,
    entry_type: String,
    category: String,
    amount_cents: i64,
    note: String,
    created_at: String,
    synced: bool,
}

impl TryFrom<EntryRow> for Entry {
    type Error = DbError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT)
            .map_err(|_| DbError::corrupt("date", &row.id, &row.date))?;
        let entry_type: EntryType = row
            .entry_type
            .parse()
            .map_err(|_| DbError::corrupt("entry_type", &row.id, &row.entry_type))?;
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|_| DbError::corrupt("created_at", &row.id, &row.created_at))?
            .with_timezone(&Utc);

        Ok(Entry {
            id: row.id,
            date,
            entry_type,
            category: row.category,
            amount: Money::from_cents(row.amount_cents),
            note: row.note,
            created_at,
            synced: row.synced,
        })
    }
}

fn rows_to_entries(rows: Vec<EntryRow>) -> DbResult<Vec<Entry>> {
    rows.into_iter().map(Entry::try_from).collect()
}

fn date_text(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Fixed-width timestamp text so that string order equals time order.
fn timestamp_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for ledger entries and pending deletions.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
}

impl EntryRepository {
    /// Creates a new EntryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EntryRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Local edits
    // -------------------------------------------------------------------------

    /// Creates an entry from a draft.
    ///
    /// Assigns a fresh id and `created_at`, stores it with `synced = false`.
    pub async fn add(&self, draft: EntryDraft) -> DbResult<Entry> {
        validate_draft(&draft)?;
        let entry = Entry::from_draft(draft);

        debug!(id = %entry.id, date = %entry.date, "Adding entry");

        self.insert(&entry).await?;
        Ok(entry)
    }

    /// Inserts a fully formed entry as-is.
    ///
    /// Used by `add` and by imports; fails with `UniqueViolation` if the id
    /// already exists.
    pub async fn insert(&self, entry: &Entry) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (
                id, date, entry_type, category, amount_cents, note, created_at, synced
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry.id)
        .bind(date_text(entry.date))
        .bind(entry.entry_type.as_str())
        .bind(&entry.category)
        .bind(entry.amount.cents())
        .bind(&entry.note)
        .bind(timestamp_text(entry.created_at))
        .bind(entry.synced)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a partial update and resets `synced`.
    ///
    /// ## Returns
    /// * `Ok(Entry)` - the entry after the update
    /// * `Err(DbError::NotFound)` - no entry with that id
    pub async fn update(&self, id: &str, patch: EntryPatch) -> DbResult<Entry> {
        validate_patch(&patch)?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_ENTRY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Entry", id))?;

        let mut entry = Entry::try_from(row)?;
        entry.apply_patch(patch);

        sqlx::query(
            r#"
            UPDATE entries SET
                date = ?2,
                entry_type = ?3,
                category = ?4,
                amount_cents = ?5,
                note = ?6,
                synced = 0
            WHERE id = ?1
            "#,
        )
        .bind(&entry.id)
        .bind(date_text(entry.date))
        .bind(entry.entry_type.as_str())
        .bind(&entry.category)
        .bind(entry.amount.cents())
        .bind(&entry.note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %entry.id, "Updated entry");
        Ok(entry)
    }

    /// Deletes an entry and records its id for remote deletion.
    ///
    /// Happens regardless of the entry's sync state: an unsynced entry may
    /// still have reached the sheet in a push whose confirmation was lost.
    ///
    /// ## Returns
    /// * `true` - the entry existed and is gone
    /// * `false` - unknown id; nothing changed, pending deletions untouched
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM entries WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            debug!(id = %id, "Delete ignored, no such entry");
            return Ok(false);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO pending_deletions (entry_id, deleted_at) VALUES (?1, ?2)",
        )
        .bind(id.trim())
        .bind(timestamp_text(Utc::now()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, "Deleted entry, queued for remote deletion");
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets an entry by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<Entry>> {
        let row = sqlx::query_as::<_, EntryRow>(&format!("{SELECT_ENTRY} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Entry::try_from).transpose()
    }

    /// All entries, newest first (`date DESC, created_at DESC`).
    pub async fn list_all(&self) -> DbResult<Vec<Entry>> {
        self.list_filtered(EntryFilter::default()).await
    }

    /// Entries matching the filter, newest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let march_expenses = db.entries().list_filtered(EntryFilter {
    ///     month: Some("2024-03".parse()?),
    ///     entry_type: Some(EntryType::Expense),
    /// }).await?;
    /// ```
    pub async fn list_filtered(&self, filter: EntryFilter) -> DbResult<Vec<Entry>> {
        let (from, until) = match filter.month {
            Some(month) => (
                Some(date_text(month.first_day())),
                Some(date_text(month.next_month_first_day())),
            ),
            None => (None, None),
        };
        let entry_type = filter.entry_type.map(|t| t.as_str());

        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            r#"{SELECT_ENTRY}
            WHERE (?1 IS NULL OR date >= ?1)
              AND (?2 IS NULL OR date < ?2)
              AND (?3 IS NULL OR entry_type = ?3)
            ORDER BY date DESC, created_at DESC
            "#
        ))
        .bind(from)
        .bind(until)
        .bind(entry_type)
        .fetch_all(&self.pool)
        .await?;

        rows_to_entries(rows)
    }

    /// Entries not yet confirmed on the sheet, oldest first.
    pub async fn list_unsynced(&self) -> DbResult<Vec<Entry>> {
        let rows = sqlx::query_as::<_, EntryRow>(&format!(
            "{SELECT_ENTRY} WHERE synced = 0 ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows_to_entries(rows)
    }

    /// Ids of entries believed identical to a remote row.
    pub async fn list_synced_ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM entries WHERE synced = 1")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// Number of entries in the ledger.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of entries waiting for a push.
    pub async fn count_unsynced(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE synced = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Income and expense totals for one month.
    pub async fn month_summary(&self, month: YearMonth) -> DbResult<MonthSummary> {
        let totals = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT entry_type, COALESCE(SUM(amount_cents), 0)
            FROM entries
            WHERE date >= ?1 AND date < ?2
            GROUP BY entry_type
            "#,
        )
        .bind(date_text(month.first_day()))
        .bind(date_text(month.next_month_first_day()))
        .fetch_all(&self.pool)
        .await?;

        let mut summary = MonthSummary::default();
        for (entry_type, cents) in totals {
            match entry_type.parse::<EntryType>() {
                Ok(EntryType::Income) => summary.income = Money::from_cents(cents),
                Ok(EntryType::Expense) => summary.expense = Money::from_cents(cents),
                Err(_) => return Err(DbError::corrupt("entry_type", "summary", entry_type)),
            }
        }
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // Reconciliation support
    // -------------------------------------------------------------------------

    /// Marks the given entries as synced. Ids that no longer exist are
    /// ignored. Returns how many rows changed.
    pub async fn mark_synced(&self, ids: &[String]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut changed = 0;
        for id in ids {
            changed += sqlx::query("UPDATE entries SET synced = 1 WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        debug!(requested = ids.len(), changed, "Marked entries synced");
        Ok(changed)
    }

    /// Marks entries synced only if they still hold the content that was
    /// pushed. An entry edited after the push snapshot stays unsynced.
    pub async fn mark_pushed(&self, pushed: &[Entry]) -> DbResult<u64> {
        if pushed.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut changed = 0;
        for entry in pushed {
            changed += sqlx::query(
                r#"
                UPDATE entries SET synced = 1
                WHERE id = ?1 AND date = ?2 AND entry_type = ?3
                  AND category = ?4 AND amount_cents = ?5 AND note = ?6
                "#,
            )
            .bind(&entry.id)
            .bind(date_text(entry.date))
            .bind(entry.entry_type.as_str())
            .bind(&entry.category)
            .bind(entry.amount.cents())
            .bind(&entry.note)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;

        if (changed as usize) < pushed.len() {
            debug!(
                pushed = pushed.len(),
                changed, "Some pushed entries changed meanwhile, left unsynced"
            );
        }
        Ok(changed)
    }

    /// Marks every entry unsynced so the next push re-uploads the ledger.
    pub async fn mark_all_unsynced(&self) -> DbResult<u64> {
        let changed = sqlx::query("UPDATE entries SET synced = 0 WHERE synced = 1")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(changed, "Marked all entries unsynced");
        Ok(changed)
    }

    /// Inserts remote entries that are new to this device.
    ///
    /// ## Rules
    /// - ids in pending deletions are skipped (the local delete wins)
    /// - ids already present locally are left untouched
    /// - inserted entries are stored with `synced = true`
    ///
    /// ## Returns
    /// Number of entries inserted.
    pub async fn merge(&self, remote: Vec<Entry>) -> DbResult<usize> {
        if remote.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let pending: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT entry_id FROM pending_deletions")
                .fetch_all(&mut *tx)
                .await?
                .into_iter()
                .map(|id| id.trim().to_string())
                .collect();

        let mut added = 0;
        for entry in &remote {
            let id = entry.id.trim();
            if id.is_empty() {
                continue;
            }
            if pending.contains(id) {
                debug!(id = %id, "Skipping remote entry pending local deletion");
                continue;
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO entries (
                    id, date, entry_type, category, amount_cents, note, created_at, synced
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(date_text(entry.date))
            .bind(entry.entry_type.as_str())
            .bind(&entry.category)
            .bind(entry.amount.abs().cents())
            .bind(&entry.note)
            .bind(timestamp_text(entry.created_at))
            .execute(&mut *tx)
            .await?
            .rows_affected();

            added += inserted as usize;
        }

        tx.commit().await?;

        debug!(candidates = remote.len(), added, "Merged remote entries");
        Ok(added)
    }

    /// Removes an entry without recording a pending deletion.
    ///
    /// Used when the sheet no longer has the row: there is nothing left to
    /// delete remotely.
    pub async fn remove_local_only(&self, id: &str) -> DbResult<bool> {
        let removed = sqlx::query("DELETE FROM entries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(removed > 0)
    }

    /// Ids waiting to be deleted remotely, oldest deletion first.
    pub async fn pending_deletions(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT entry_id FROM pending_deletions ORDER BY deleted_at ASC, entry_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Records an id for remote deletion without touching entries.
    ///
    /// Used for ids known only remotely (e.g. a row the user wants gone
    /// from the sheet that never reached this device).
    pub async fn record_pending_deletion(&self, id: &str) -> DbResult<()> {
        validate_entry_id(id)?;
        sqlx::query(
            "INSERT OR IGNORE INTO pending_deletions (entry_id, deleted_at) VALUES (?1, ?2)",
        )
        .bind(id.trim())
        .bind(timestamp_text(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Forgets the given pending deletions. Returns how many were removed.
    pub async fn clear_pending_deletions(&self, ids: &[String]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut cleared = 0;
        for id in ids {
            cleared += sqlx::query("DELETE FROM pending_deletions WHERE entry_id = ?1")
                .bind(id.trim())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        }
        tx.commit().await?;

        debug!(cleared, "Cleared pending deletions");
        Ok(cleared)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
