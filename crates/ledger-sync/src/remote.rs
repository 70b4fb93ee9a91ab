//! # Remote Table Seam
//!
//! The engine talks to the spreadsheet only through [`RemoteTable`], so the
//! reconciliation rules can be exercised against an in-memory table.
//!
//! ## Row Indexing
//! ```text
//!   index 0   header   (ID │ 日期 │ 類型 │ ...)
//!   index 1   first data row      ◄── read_rows()[0]
//!   index 2   second data row
//! ```
//! `read_id_column` returns column A *including* the header, so position in
//! the returned vector is the row index used by `update_row`/`delete_rows`.

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::row::RowValues;

/// A remote two-dimensional table of entry rows.
///
/// Every call receives the bearer token; implementations hold no
/// credential of their own.
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Checks that the table exists and is accessible.
    async fn open(&self, token: &str, table_id: &str) -> SyncResult<()>;

    /// Creates a new table with the header row and returns its id.
    async fn create(&self, token: &str) -> SyncResult<String>;

    /// Column A of every row, header first.
    async fn read_id_column(&self, token: &str, table_id: &str) -> SyncResult<Vec<String>>;

    /// All data rows (header excluded) as displayed text.
    async fn read_rows(&self, token: &str, table_id: &str) -> SyncResult<Vec<Vec<String>>>;

    /// Appends rows after the last row, in order.
    async fn append_rows(&self, token: &str, table_id: &str, rows: &[RowValues])
        -> SyncResult<()>;

    /// Overwrites the row at `row_index` (0 = header, never written).
    async fn update_row(
        &self,
        token: &str,
        table_id: &str,
        row_index: usize,
        row: &RowValues,
    ) -> SyncResult<()>;

    /// Deletes the given rows in one request.
    ///
    /// Implementations must apply deletions in [`deletion_order`] so earlier
    /// deletions do not shift the indices of later ones.
    async fn delete_rows(&self, token: &str, table_id: &str, row_indices: &[usize])
        -> SyncResult<()>;
}

/// Sorts row indices for deletion: descending, duplicates removed, header
/// (index 0) excluded.
pub fn deletion_order(row_indices: &[usize]) -> Vec<usize> {
    let mut ordered: Vec<usize> = row_indices.iter().copied().filter(|&i| i > 0).collect();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();
    ordered
}

// =============================================================================
// In-Memory Table (tests)
// =============================================================================
