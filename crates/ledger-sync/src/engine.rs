//! # Reconciliation Engine
//!
//! Keeps the local ledger and the spreadsheet in agreement.
//!
//! ## Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           full_sync                                     │
//! │                                                                         │
//! │  token? ──no──► Unauthenticated (no network)                           │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  PULL (sheet → ledger)                                                 │
//! │  1. resolve table (reuse stored id, else create)                       │
//! │  2. read rows, collect remote ids                                      │
//! │  3. sweep: synced local entries missing remotely are removed           │
//! │     (not pending deletions; skipped when the table is new)             │
//! │  4. merge new remote rows (synced = true)                              │
//! │    │                                                                    │
//! │    ▼  (a failed pull ends the cycle)                                    │
//! │  PUSH (ledger → sheet)                                                 │
//! │  1. deletions: find rows of pending ids, one batch, descending         │
//! │  2. changes: re-read ids, update known rows, append the rest           │
//! │  3. mark pushed entries synced                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! One cycle at a time. `sync_from_sheet`, `sync_to_sheet` and `full_sync`
//! wait for a running cycle to finish; `try_full_sync` refuses instead.
//! Remote row indices are only used right after the read that produced them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use ledger_core::Entry;
use ledger_db::Database;

use crate::credentials::CredentialProvider;
use crate::error::{SyncError, SyncResult};
use crate::events::{EngineState, SyncEvent, SyncStatus};
use crate::remote::{deletion_order, RemoteTable};
use crate::row::{decode_rows, encode_row};

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

const SPREADSHEET_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

// =============================================================================
// Outcomes
// =============================================================================

/// Result of an engine entry point.
///
/// Failures are values, not panics: every failure has already been logged
/// and published as an `Error` status event when this is returned.
#[derive(Debug, Clone)]
pub enum SyncOutcome<T> {
    Completed(T),
    Failed(SyncError),
}

impl<T> SyncOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncOutcome::Completed(_) => None,
            SyncOutcome::Failed(err) => Some(err),
        }
    }

    pub fn into_result(self) -> SyncResult<T> {
        match self {
            SyncOutcome::Completed(value) => Ok(value),
            SyncOutcome::Failed(err) => Err(err),
        }
    }
}

impl<T> From<SyncResult<T>> for SyncOutcome<T> {
    fn from(result: SyncResult<T>) -> Self {
        match result {
            Ok(value) => SyncOutcome::Completed(value),
            Err(err) => SyncOutcome::Failed(err),
        }
    }
}

/// What a pull changed locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub table_id: String,
    /// Remote rows inserted locally.
    pub added: usize,
    /// Synced local entries removed because their row is gone.
    pub removed: usize,
    /// The stored table was missing and a new one was created.
    pub created_table: bool,
}

/// What a push changed remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// `None` when there was nothing to push and no table was resolved.
    pub table_id: Option<String>,
    /// Pending ids whose rows were deleted.
    pub deleted: usize,
    /// Pending ids with no remote row, forgotten.
    pub cleared_missing: usize,
    pub updated: usize,
    pub appended: usize,
}

impl PushReport {
    pub fn pushed(&self) -> usize {
        self.updated + self.appended
    }

    pub fn is_noop(&self) -> bool {
        self.deleted == 0 && self.cleared_missing == 0 && self.pushed() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullSyncReport {
    pub pull: PullReport,
    pub push: PushReport,
}

/// Deletion phase result. A remote failure does not stop the push.
#[derive(Debug, Default)]
struct DeletionPass {
    deleted: usize,
    cleared_missing: usize,
    failure: Option<SyncError>,
}

// =============================================================================
// Engine
// =============================================================================

/// The reconciliation engine. Construct once and share by reference.
pub struct SyncEngine {
    db: Database,
    remote: Arc<dyn RemoteTable>,
    credentials: Arc<dyn CredentialProvider>,
    state: RwLock<EngineState>,
    last_error: RwLock<Option<String>>,
    /// Held for the whole of a cycle.
    cycle: Mutex<()>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(
        db: Database,
        remote: Arc<dyn RemoteTable>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        SyncEngine {
            db,
            remote,
            credentials,
            state: RwLock::new(EngineState::Idle),
            last_error: RwLock::new(None),
            cycle: Mutex::new(()),
            events,
        }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Message of the last failed cycle, cleared by the next success.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    /// Browser URL of the current spreadsheet, if one is known.
    pub async fn spreadsheet_url(&self) -> SyncResult<Option<String>> {
        let id = self.db.settings().sheet_id().await?;
        Ok(id.map(|id| format!("{}{}", SPREADSHEET_URL_PREFIX, id)))
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Pulls remote rows into the local ledger.
    pub async fn sync_from_sheet(&self) -> SyncOutcome<PullReport> {
        let _cycle = self.cycle.lock().await;
        let result = self.pull().await;
        self.finish(result).await
    }

    /// Pushes pending deletions and unsynced entries to the sheet.
    pub async fn sync_to_sheet(&self) -> SyncOutcome<PushReport> {
        let _cycle = self.cycle.lock().await;
        let result = self.push().await;
        self.finish(result).await
    }

    /// Pull then push, as one cycle.
    pub async fn full_sync(&self) -> SyncOutcome<FullSyncReport> {
        let _cycle = self.cycle.lock().await;
        let result = self.pull_then_push().await;
        self.finish(result).await
    }

    /// Like [`full_sync`](Self::full_sync) but fails with `AlreadyRunning`
    /// instead of waiting for a running cycle.
    pub async fn try_full_sync(&self) -> SyncOutcome<FullSyncReport> {
        let Ok(_cycle) = self.cycle.try_lock() else {
            warn!("Sync requested while a cycle is running");
            return SyncOutcome::Failed(SyncError::AlreadyRunning);
        };
        let result = self.pull_then_push().await;
        self.finish(result).await
    }

    /// Called after a local add/edit/delete. Runs a normal push: it already
    /// sends only what changed.
    pub async fn push_after_edit(&self) -> SyncOutcome<PushReport> {
        self.sync_to_sheet().await
    }

    // =========================================================================
    // Cycle Bookkeeping
    // =========================================================================

    fn token(&self) -> SyncResult<String> {
        self.credentials
            .current_token()
            .filter(|t| !t.trim().is_empty())
            .ok_or(SyncError::Unauthenticated)
    }

    async fn set_state(&self, state: EngineState) {
        *self.state.write().await = state;
    }

    fn emit(&self, event: SyncEvent) {
        debug!(event = %event, "Sync event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_status(&self, status: SyncStatus, message: impl Into<String>, table_id: Option<&str>) {
        self.emit(SyncEvent::status(status, message, table_id));
    }

    async fn finish<T>(&self, result: SyncResult<T>) -> SyncOutcome<T> {
        match result {
            Ok(value) => {
                self.set_state(EngineState::Idle).await;
                *self.last_error.write().await = None;
                SyncOutcome::Completed(value)
            }
            Err(err) => {
                error!(error = %err, "Sync failed");
                self.set_state(EngineState::Error).await;
                *self.last_error.write().await = Some(err.to_string());

                let table_id = self.db.settings().sheet_id().await.ok().flatten();
                self.emit_status(SyncStatus::Error, err.to_string(), table_id.as_deref());
                SyncOutcome::Failed(err)
            }
        }
    }

    async fn pull_then_push(&self) -> SyncResult<FullSyncReport> {
        self.token()?;
        let pull = self.pull().await?;
        let push = self.push().await?;
        info!(
            added = pull.added,
            removed = pull.removed,
            pushed = push.pushed(),
            deleted = push.deleted,
            "Full sync complete"
        );
        Ok(FullSyncReport { pull, push })
    }

    /// Returns the table to use and whether it was just created.
    ///
    /// A stored id is dropped only when the table is gone (404) or no longer
    /// ours (403); any other failure keeps it.
    async fn resolve_table(&self, token: &str) -> SyncResult<(String, bool)> {
        let settings = self.db.settings();

        if let Some(table_id) = settings.sheet_id().await? {
            match self.remote.open(token, &table_id).await {
                Ok(()) => return Ok((table_id, false)),
                Err(err) if err.discards_table() => {
                    warn!(table_id = %table_id, error = %err, "Stored spreadsheet unusable, creating a new one");
                    settings.clear_sheet_id().await?;
                }
                Err(err) => return Err(err),
            }
        }

        let table_id = self.remote.create(token).await?;
        settings.set_sheet_id(&table_id).await?;
        info!(table_id = %table_id, "Using new spreadsheet");
        Ok((table_id, true))
    }

    // =========================================================================
    // Pull
    // =========================================================================

    async fn pull(&self) -> SyncResult<PullReport> {
        let token = self.token()?;
        self.set_state(EngineState::Pulling).await;
        self.emit_status(SyncStatus::Syncing, "Pulling from sheet", None);

        let (table_id, created_table) = self.resolve_table(&token).await?;
        let rows = self.remote.read_rows(&token, &table_id).await?;

        let remote_ids: HashSet<&str> = rows
            .iter()
            .filter_map(|row| row.first())
            .map(|cell| cell.trim())
            .filter(|id| !id.is_empty())
            .collect();

        let entries = self.db.entries();
        let mut removed = 0;

        if created_table {
            // Nothing in a new table can vouch for "synced"
            let reset = entries.mark_all_unsynced().await?;
            if reset > 0 {
                info!(reset, "New spreadsheet, local entries will be uploaded");
            }
        } else {
            let pending: HashSet<String> = entries.pending_deletions().await?.into_iter().collect();
            for id in entries.list_synced_ids().await? {
                if remote_ids.contains(id.trim()) || pending.contains(id.trim()) {
                    continue;
                }
                if entries.remove_local_only(&id).await? {
                    debug!(id = %id, "Row deleted in sheet, removing local copy");
                    removed += 1;
                }
            }
        }

        let added = entries.merge(decode_rows(&rows)).await?;

        info!(table_id = %table_id, rows = rows.len(), added, removed, "Pull complete");

        self.emit(SyncEvent::DataChanged {
            added,
            removed,
            synced: 0,
        });
        if added + removed > 0 {
            self.emit_status(
                SyncStatus::Success,
                format!("Pulled {} new, removed {}", added, removed),
                Some(&table_id),
            );
        } else {
            self.emit_status(SyncStatus::Idle, "Already up to date", Some(&table_id));
        }

        Ok(PullReport {
            table_id,
            added,
            removed,
            created_table,
        })
    }

    // =========================================================================
    // Push
    // =========================================================================

    async fn push(&self) -> SyncResult<PushReport> {
        let token = self.token()?;
        let entries = self.db.entries();

        let pending = entries.pending_deletions().await?;
        let mut unsynced = entries.list_unsynced().await?;

        if pending.is_empty() && unsynced.is_empty() {
            let table_id = self.db.settings().sheet_id().await?;
            debug!("Nothing to push");
            self.emit_status(SyncStatus::Idle, "Already up to date", table_id.as_deref());
            return Ok(PushReport {
                table_id,
                ..PushReport::default()
            });
        }

        self.set_state(EngineState::Pushing).await;
        self.emit_status(SyncStatus::Syncing, "Pushing to sheet", None);

        let (table_id, created_table) = self.resolve_table(&token).await?;
        if created_table {
            // The new table holds none of the rows we believed synced
            let reset = entries.mark_all_unsynced().await?;
            info!(reset, "New spreadsheet, re-uploading the ledger");
            unsynced = entries.list_unsynced().await?;
        }

        let deletions = self.push_deletions(&token, &table_id, &pending).await?;
        let (updated, appended) = self.push_changes(&token, &table_id, &unsynced).await?;

        let report = PushReport {
            table_id: Some(table_id.clone()),
            deleted: deletions.deleted,
            cleared_missing: deletions.cleared_missing,
            updated,
            appended,
        };

        info!(
            table_id = %table_id,
            deleted = report.deleted,
            cleared_missing = report.cleared_missing,
            updated,
            appended,
            "Push complete"
        );

        self.emit(SyncEvent::DataChanged {
            added: 0,
            removed: 0,
            synced: report.pushed(),
        });

        if let Some(err) = deletions.failure {
            return Err(SyncError::DeletionsFailed {
                message: err.to_string(),
                pushed: report.pushed(),
            });
        }

        self.emit_status(
            SyncStatus::Success,
            format!(
                "Pushed {} ({} updated, {} appended), deleted {}",
                report.pushed(),
                updated,
                appended,
                report.deleted
            ),
            Some(&table_id),
        );
        Ok(report)
    }

    /// Deletes the rows of pending ids. Local store errors propagate; remote
    /// errors are returned in the pass so the change phase still runs.
    async fn push_deletions(
        &self,
        token: &str,
        table_id: &str,
        pending: &[String],
    ) -> SyncResult<DeletionPass> {
        let mut pass = DeletionPass::default();
        if pending.is_empty() {
            return Ok(pass);
        }

        let id_column = match self.remote.read_id_column(token, table_id).await {
            Ok(column) => column,
            Err(err) => {
                warn!(error = %err, pending = pending.len(), "Could not read ids for deletion, will retry");
                pass.failure = Some(err);
                return Ok(pass);
            }
        };

        let mut found = Vec::new();
        let mut missing = Vec::new();
        let mut row_indices = Vec::new();

        for id in pending {
            let target = id.trim();
            let rows: Vec<usize> = id_column
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, cell)| cell.trim() == target)
                .map(|(index, _)| index)
                .collect();

            if rows.is_empty() {
                missing.push(id.clone());
            } else {
                row_indices.extend(rows);
                found.push(id.clone());
            }
        }

        let entries = self.db.entries();

        if !missing.is_empty() {
            entries.clear_pending_deletions(&missing).await?;
            self.drop_local_copies(&missing).await?;
            debug!(count = missing.len(), "Pending deletions already absent from sheet");
            pass.cleared_missing = missing.len();
        }

        if row_indices.is_empty() {
            return Ok(pass);
        }

        let ordered = deletion_order(&row_indices);
        match self.remote.delete_rows(token, table_id, &ordered).await {
            Ok(()) => {
                entries.clear_pending_deletions(&found).await?;
                self.drop_local_copies(&found).await?;
                info!(ids = found.len(), rows = ordered.len(), "Deleted rows from sheet");
                pass.deleted = found.len();
            }
            Err(err) => {
                warn!(error = %err, ids = found.len(), "Deleting rows failed, will retry");
                pass.failure = Some(err);
            }
        }

        Ok(pass)
    }

    /// A confirmed deletion also removes any local entry still carrying the id.
    async fn drop_local_copies(&self, ids: &[String]) -> SyncResult<()> {
        let entries = self.db.entries();
        for id in ids {
            if entries.remove_local_only(id).await? {
                debug!(id = %id, "Removed lingering local copy of deleted entry");
            }
        }
        Ok(())
    }

    /// Overwrites every row that already carries an entry's id and appends
    /// the rest. Returns `(updated, appended)` counted in entries.
    ///
    /// Entries are marked synced only while they still hold the pushed
    /// content, so an edit made during the push is sent next time.
    async fn push_changes(
        &self,
        token: &str,
        table_id: &str,
        unsynced: &[Entry],
    ) -> SyncResult<(usize, usize)> {
        if unsynced.is_empty() {
            return Ok((0, 0));
        }

        // Fresh read: the deletion pass may have shifted every index
        let id_column = self.remote.read_id_column(token, table_id).await?;
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        for (index, cell) in id_column.iter().enumerate().skip(1) {
            let id = cell.trim();
            if !id.is_empty() {
                positions.entry(id).or_default().push(index);
            }
        }

        let entries = self.db.entries();
        let mut updated: Vec<Entry> = Vec::new();
        let mut appended: Vec<Entry> = Vec::new();
        let mut append_rows = Vec::new();

        for entry in unsynced {
            let row = encode_row(entry);
            match positions.get(entry.id.trim()) {
                Some(rows) => {
                    if rows.len() > 1 {
                        debug!(id = %entry.id, copies = rows.len(), "Overwriting duplicate rows");
                    }
                    for &row_index in rows {
                        if let Err(err) =
                            self.remote.update_row(token, table_id, row_index, &row).await
                        {
                            entries.mark_pushed(&updated).await?;
                            return Err(err);
                        }
                    }
                    updated.push(entry.clone());
                }
                None => {
                    appended.push(entry.clone());
                    append_rows.push(row);
                }
            }
        }
        entries.mark_pushed(&updated).await?;

        if !append_rows.is_empty() {
            self.remote.append_rows(token, table_id, &append_rows).await?;
            entries.mark_pushed(&appended).await?;
        }

        Ok((updated.len(), appended.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::SessionCredentials;
    use crate::remote::memory::{MemoryTable, Op};
    use chrono::NaiveDate;
    use ledger_core::{EntryDraft, EntryPatch, EntryType, Money};
    use ledger_db::DbConfig;

    async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn engine_for(db: &Database, remote: &Arc<MemoryTable>) -> SyncEngine {
        SyncEngine::new(
            db.clone(),
            remote.clone(),
            Arc::new(SessionCredentials::with_token("tok")),
        )
    }

    async fn setup() -> (SyncEngine, Arc<MemoryTable>, Database) {
        let db = database().await;
        let remote = Arc::new(MemoryTable::new());
        (engine_for(&db, &remote), remote, db)
    }

    /// Seeds table "t" and makes it the stored spreadsheet.
    async fn with_table(db: &Database, remote: &MemoryTable, rows: Vec<Vec<&str>>) {
        remote.seed("t", rows);
        db.settings().set_sheet_id("t").await.unwrap();
    }

    fn row<'a>(id: &'a str, amount: &'a str) -> Vec<&'a str> {
        vec![id, "2024-03-01", "支出", "飲食", amount, "", "2024-03-01T08:00:00.000Z"]
    }

    fn draft(category: &str, cents: i64) -> EntryDraft {
        EntryDraft {
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            entry_type: EntryType::Expense,
            category: category.to_string(),
            amount: Money::from_cents(cents),
            note: Some("午餐".to_string()),
        }
    }

    fn local(id: &str, synced: bool) -> Entry {
        Entry {
            id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            entry_type: EntryType::Expense,
            category: "飲食".to_string(),
            amount: Money::from_cents(1000),
            note: String::new(),
            created_at: chrono::Utc::now(),
            synced,
        }
    }

    async fn local_ids(db: &Database) -> Vec<String> {
        let mut ids: Vec<String> = db
            .entries()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        ids.sort();
        ids
    }

    fn drain(rx: &mut broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_unauthenticated_makes_no_network_call() {
        let db = database().await;
        let remote = Arc::new(MemoryTable::new());
        let engine = SyncEngine::new(db.clone(), remote.clone(), Arc::new(SessionCredentials::new()));
        db.entries().add(draft("飲食", 100)).await.unwrap();

        let outcome = engine.full_sync().await;
        assert!(matches!(outcome.error(), Some(SyncError::Unauthenticated)));
        assert!(matches!(
            engine.sync_to_sheet().await.error(),
            Some(SyncError::Unauthenticated)
        ));

        assert_eq!(remote.call_count(), 0);
        assert_eq!(engine.state().await, EngineState::Error);
        assert!(engine.last_error().await.is_some());
    }

    #[tokio::test]
    async fn test_first_pull_creates_table_and_reports_idle() {
        let (engine, remote, db) = setup().await;
        let mut rx = engine.subscribe();

        let report = engine.sync_from_sheet().await.into_result().unwrap();
        assert!(report.created_table);
        assert_eq!(remote.table_count(), 1);
        assert_eq!(db.settings().sheet_id().await.unwrap(), Some(report.table_id.clone()));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            SyncEvent::StatusChanged { status: SyncStatus::Syncing, .. }
        ));
        assert_eq!(
            events[1],
            SyncEvent::DataChanged { added: 0, removed: 0, synced: 0 }
        );
        assert!(matches!(
            &events[2],
            SyncEvent::StatusChanged { status: SyncStatus::Idle, table_id: Some(id), .. } if *id == report.table_id
        ));
        assert_eq!(engine.state().await, EngineState::Idle);
    }

    #[tokio::test]
    async fn test_missing_table_is_recreated_and_ledger_reuploaded() {
        let (engine, remote, db) = setup().await;
        let a = db.entries().add(draft("飲食", 100)).await.unwrap();
        let b = db.entries().add(draft("交通", 200)).await.unwrap();
        db.entries().mark_synced(&[a.id.clone(), b.id.clone()]).await.unwrap();
        db.settings().set_sheet_id("deleted-by-user").await.unwrap();

        let pull = engine.sync_from_sheet().await.into_result().unwrap();
        assert!(pull.created_table);
        assert_eq!(pull.removed, 0);
        assert_eq!(db.entries().count_unsynced().await.unwrap(), 2);
        assert_ne!(pull.table_id, "deleted-by-user");

        let push = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(push.appended, 2);
        assert_eq!(remote.rows(&pull.table_id).len(), 2);
        assert_eq!(db.entries().count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_token_keeps_table_id() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("a1", "10")]).await;
        remote.fail_on(Op::Open, SyncError::Unauthorized("expired".into()));

        let outcome = engine.sync_from_sheet().await;
        assert!(matches!(outcome.error(), Some(SyncError::Unauthorized(_))));
        assert_eq!(db.settings().sheet_id().await.unwrap().as_deref(), Some("t"));
        assert_eq!(remote.table_count(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_table_is_replaced() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        remote.fail_on(Op::Open, SyncError::Forbidden("t".into()));

        let report = engine.sync_from_sheet().await.into_result().unwrap();
        assert!(report.created_table);
        assert_ne!(report.table_id, "t");
        assert_eq!(remote.table_count(), 2);
    }

    #[tokio::test]
    async fn test_pull_merges_remote_rows() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("a1", "120.5"), row("b1", "abc"), row("", "1")]).await;

        let report = engine.sync_from_sheet().await.into_result().unwrap();
        assert_eq!(report.added, 2);

        let a1 = db.entries().get("a1").await.unwrap().unwrap();
        assert!(a1.synced);
        assert_eq!(a1.amount.cents(), 12050);
        assert_eq!(db.entries().get("b1").await.unwrap().unwrap().amount, Money::zero());
    }

    #[tokio::test]
    async fn test_out_of_band_remote_delete_is_mirrored() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("a1", "10"), row("b1", "20")]).await;
        engine.sync_from_sheet().await.into_result().unwrap();

        // Someone removes b1 in the spreadsheet UI
        remote.seed("t", vec![row("a1", "10")]);
        let report = engine.sync_from_sheet().await.into_result().unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(local_ids(&db).await, vec!["a1"]);
        assert!(db.entries().pending_deletions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_spares_unsynced_and_pending() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        db.entries().insert(&local("new", false)).await.unwrap();
        db.entries().insert(&local("going", true)).await.unwrap();
        db.entries().record_pending_deletion("going").await.unwrap();

        let report = engine.sync_from_sheet().await.into_result().unwrap();
        assert_eq!(report.removed, 0);
        assert_eq!(local_ids(&db).await, vec!["going", "new"]);
    }

    #[tokio::test]
    async fn test_delete_wins_over_merge() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("x1", "10")]).await;
        db.entries().insert(&local("x1", true)).await.unwrap();
        assert!(db.entries().delete("x1").await.unwrap());

        let report = engine.sync_from_sheet().await.into_result().unwrap();
        assert_eq!(report.added, 0);
        assert!(db.entries().get("x1").await.unwrap().is_none());

        let push = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(push.deleted, 1);
        assert!(remote.ids("t").is_empty());
        assert!(db.entries().pending_deletions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delete_is_descending_single_request() {
        let (engine, remote, db) = setup().await;
        with_table(
            &db,
            &remote,
            vec![row("r1", "1"), row("r2", "2"), row("r3", "3"), row("r4", "4"), row("r5", "5")],
        )
        .await;
        engine.sync_from_sheet().await.into_result().unwrap();

        for id in ["r2", "r5", "r1"] {
            assert!(db.entries().delete(id).await.unwrap());
        }
        let report = engine.sync_to_sheet().await.into_result().unwrap();

        assert_eq!(report.deleted, 3);
        assert_eq!(remote.delete_calls(), vec![vec![5, 2, 1]]);
        assert_eq!(remote.ids("t"), vec!["r3", "r4"]);
    }

    #[tokio::test]
    async fn test_duplicate_rows_of_a_deleted_id_all_go() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("d1", "1"), row("k1", "2"), row(" d1 ", "1")]).await;
        db.entries().record_pending_deletion("d1").await.unwrap();

        engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(remote.delete_calls(), vec![vec![3, 1]]);
        assert_eq!(remote.ids("t"), vec!["k1"]);
    }

    #[tokio::test]
    async fn test_pending_id_absent_remotely_is_cleared() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("k1", "2")]).await;
        db.entries().record_pending_deletion("ghost").await.unwrap();

        let report = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(report.cleared_missing, 1);
        assert_eq!(report.deleted, 0);
        assert!(remote.delete_calls().is_empty());
        assert!(db.entries().pending_deletions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_deletion_keeps_pending_but_pushes_changes() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("r1", "1")]).await;
        engine.sync_from_sheet().await.into_result().unwrap();
        db.entries().delete("r1").await.unwrap();
        let added = db.entries().add(draft("交通", 300)).await.unwrap();

        remote.fail_on(Op::Delete, SyncError::ConnectionFailed("reset".into()));
        let outcome = engine.sync_to_sheet().await;

        assert!(matches!(
            outcome.error(),
            Some(SyncError::DeletionsFailed { pushed: 1, .. })
        ));
        assert_eq!(db.entries().pending_deletions().await.unwrap(), vec!["r1"]);
        assert!(db.entries().get(&added.id).await.unwrap().unwrap().synced);
        assert_eq!(remote.ids("t"), vec!["r1".to_string(), added.id.clone()]);
        assert_eq!(engine.state().await, EngineState::Error);

        remote.clear_failures();
        let report = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(report.deleted, 1);
        assert_eq!(report.pushed(), 0);
        assert_eq!(remote.ids("t"), vec![added.id]);
        assert_eq!(engine.last_error().await, None);
    }

    #[tokio::test]
    async fn test_edit_overwrites_existing_row() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("k1", "2")]).await;
        let entry = db.entries().add(draft("飲食", 5000)).await.unwrap();
        engine.push_after_edit().await.into_result().unwrap();

        db.entries()
            .update(
                &entry.id,
                EntryPatch {
                    amount: Some(Money::from_cents(8000)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let report = engine.push_after_edit().await.into_result().unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.appended, 0);
        let rows = remote.rows("t");
        assert_eq!(rows.len(), 2);
        let pushed = decode_rows(&rows);
        assert_eq!(pushed[1].id, entry.id);
        assert_eq!(pushed[1].amount.cents(), 8000);
    }

    #[tokio::test]
    async fn test_edit_overwrites_every_duplicate_row() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("x1", "5"), row("k1", "2"), row("x1", "5")]).await;
        db.entries().insert(&local("x1", false)).await.unwrap();

        let report = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.appended, 0);

        let pushed = decode_rows(&remote.rows("t"));
        assert_eq!(pushed.len(), 3);
        assert_eq!(pushed[0].amount.cents(), 1000);
        assert_eq!(pushed[1].amount.cents(), 200);
        assert_eq!(pushed[2].amount.cents(), 1000);
        assert!(db.entries().get("x1").await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_push_into_recreated_table_reuploads_synced_entries() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        let a = db.entries().add(draft("飲食", 100)).await.unwrap();
        engine.full_sync().await.into_result().unwrap();
        assert_eq!(remote.ids("t"), vec![a.id.clone()]);

        remote.remove_table("t");
        let b = db.entries().add(draft("交通", 200)).await.unwrap();
        let push = engine.push_after_edit().await.into_result().unwrap();
        let table_id = push.table_id.clone().unwrap();
        assert_eq!(remote.table_ids(), vec![table_id.clone()]);
        assert_eq!(push.appended, 2);

        let pull = engine.sync_from_sheet().await.into_result().unwrap();
        assert!(!pull.created_table);
        assert_eq!(pull.removed, 0);

        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(local_ids(&db).await, expected);
        let mut on_sheet = remote.ids(&table_id);
        on_sheet.sort();
        assert_eq!(on_sheet, expected);
        assert_eq!(db.entries().count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_noop_push_makes_no_network_call() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        let mut rx = engine.subscribe();

        let report = engine.sync_to_sheet().await.into_result().unwrap();
        assert!(report.is_noop());
        assert_eq!(report.table_id.as_deref(), Some("t"));
        assert_eq!(remote.call_count(), 0);

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [SyncEvent::StatusChanged { status: SyncStatus::Idle, .. }]
        ));
    }

    #[tokio::test]
    async fn test_double_cycle_is_idempotent() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("k1", "2")]).await;
        db.entries().add(draft("飲食", 100)).await.unwrap();
        db.entries().add(draft("交通", 200)).await.unwrap();

        let first = engine.full_sync().await.into_result().unwrap();
        assert_eq!(first.pull.added, 1);
        assert_eq!(first.push.appended, 2);

        let rows_after_first = remote.rows("t");
        let ids_after_first = local_ids(&db).await;

        let second = engine.full_sync().await.into_result().unwrap();
        assert_eq!(second.pull.added, 0);
        assert_eq!(second.pull.removed, 0);
        assert!(second.push.is_noop());

        assert_eq!(remote.rows("t"), rows_after_first);
        assert!(remote.delete_calls().is_empty());
        assert_eq!(local_ids(&db).await, ids_after_first);
        assert_eq!(db.entries().count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_through_fresh_store() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        let original = db
            .entries()
            .add(EntryDraft {
                date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                entry_type: EntryType::Income,
                category: "獎金".to_string(),
                amount: Money::from_cents(1_234_567),
                note: Some("年終".to_string()),
            })
            .await
            .unwrap();
        engine.full_sync().await.into_result().unwrap();

        let fresh = database().await;
        fresh.settings().set_sheet_id("t").await.unwrap();
        let other_device = engine_for(&fresh, &remote);
        other_device.sync_from_sheet().await.into_result().unwrap();

        let copy = fresh.entries().get(&original.id).await.unwrap().unwrap();
        assert_eq!(copy.date, original.date);
        assert_eq!(copy.entry_type, original.entry_type);
        assert_eq!(copy.category, original.category);
        assert_eq!(copy.amount, original.amount);
        assert_eq!(copy.note, original.note);
        assert!(copy.synced);
    }

    #[tokio::test]
    async fn test_reconciles_local_and_remote_changes() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![row("a1", "10"), row("c1", "30")]).await;
        db.entries().insert(&local("a1", true)).await.unwrap();
        db.entries().insert(&local("b1", false)).await.unwrap();
        db.entries().record_pending_deletion("a1").await.unwrap();

        let pull = engine.sync_from_sheet().await.into_result().unwrap();
        assert_eq!(pull.added, 1);
        assert_eq!(pull.removed, 0);
        assert!(db.entries().get("c1").await.unwrap().unwrap().synced);

        let push = engine.sync_to_sheet().await.into_result().unwrap();
        assert_eq!(push.deleted, 1);
        assert_eq!(push.appended, 1);

        assert_eq!(local_ids(&db).await, vec!["b1", "c1"]);
        assert!(db.entries().get("b1").await.unwrap().unwrap().synced);
        assert!(db.entries().pending_deletions().await.unwrap().is_empty());
        assert_eq!(remote.ids("t"), vec!["c1", "b1"]);
    }

    #[tokio::test]
    async fn test_failed_pull_aborts_cycle() {
        let (engine, remote, db) = setup().await;
        with_table(&db, &remote, vec![]).await;
        db.entries().add(draft("飲食", 100)).await.unwrap();
        remote.fail_on(
            Op::ReadRows,
            SyncError::Api {
                status: 503,
                message: "unavailable".into(),
            },
        );

        let outcome = engine.full_sync().await;
        assert!(matches!(outcome.error(), Some(SyncError::Api { status: 503, .. })));
        assert!(remote.rows("t").is_empty());
        assert_eq!(db.entries().count_unsynced().await.unwrap(), 1);
        assert_eq!(engine.last_error().await.as_deref(), Some("Sheets API error 503: unavailable"));
    }

    #[tokio::test]
    async fn test_try_full_sync_rejects_while_running() {
        let (engine, remote, _db) = setup().await;

        let running = engine.cycle.lock().await;
        let outcome = engine.try_full_sync().await;
        assert!(matches!(outcome.error(), Some(SyncError::AlreadyRunning)));
        assert_eq!(remote.call_count(), 0);
        assert_eq!(engine.state().await, EngineState::Idle);
        drop(running);

        assert!(engine.try_full_sync().await.is_completed());
    }

    #[tokio::test]
    async fn test_spreadsheet_url() {
        let (engine, _remote, db) = setup().await;
        assert_eq!(engine.spreadsheet_url().await.unwrap(), None);

        db.settings().set_sheet_id("abc123").await.unwrap();
        assert_eq!(
            engine.spreadsheet_url().await.unwrap().as_deref(),
            Some("https://docs.google.com/spreadsheets/d/abc123")
        );
    }
}
