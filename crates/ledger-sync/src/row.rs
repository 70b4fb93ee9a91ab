//! # Sheet Row Codec
//!
//! Converts between [`Entry`] and the spreadsheet's 7-column row.
//!
//! ## Row Layout
//! ```text
//! ┌──────┬────────────┬──────┬──────┬────────┬──────┬──────────────────────────┐
//! │  A   │     B      │  C   │  D   │   E    │  F   │            G             │
//! │  ID  │   日期     │ 類型 │ 分類 │  金額  │ 備註 │        建立時間          │
//! ├──────┼────────────┼──────┼──────┼────────┼──────┼──────────────────────────┤
//! │ a1   │ 2024-03-05 │ 支出 │ 飲食 │ 120.5  │ 午餐 │ 2024-03-05T04:10:00.000Z │
//! └──────┴────────────┴──────┴──────┴────────┴──────┴──────────────────────────┘
//! ```
//!
//! ## Reading Hand-Edited Rows
//! Rows are decoded leniently because people edit the sheet directly:
//! - amount in E; if E is empty or not a number but F is, every column from
//!   E onward is read one to the right (amount F, note G, createdAt H)
//! - an amount that still does not parse becomes 0
//! - missing note is empty, missing createdAt is "now"
//! - rows with an empty ID or an unreadable date are skipped

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use ledger_core::{Entry, EntryType, Money, DATE_FORMAT};

/// Header row written when a spreadsheet is created.
pub const HEADER: [&str; 7] = ["ID", "日期", "類型", "分類", "金額", "備註", "建立時間"];

/// Number of columns an encoded row occupies (A-G).
pub const COLUMN_COUNT: usize = HEADER.len();

/// One row as written to the API: a JSON value per cell.
pub type RowValues = Vec<Value>;

const COL_ID: usize = 0;
const COL_DATE: usize = 1;
const COL_TYPE: usize = 2;
const COL_CATEGORY: usize = 3;
const COL_AMOUNT: usize = 4;

/// Dates typed into the sheet by hand may use slashes.
const DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];

// =============================================================================
// Encoding
// =============================================================================

/// Encodes an entry as a row. The amount is written as a number so the
/// sheet can sum it.
pub fn encode_row(entry: &Entry) -> RowValues {
    let amount = serde_json::Number::from_f64(entry.amount.to_major_f64())
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(entry.amount.to_decimal_string()));

    vec![
        Value::String(entry.id.clone()),
        Value::String(entry.date.format(DATE_FORMAT).to_string()),
        Value::String(entry.entry_type.label().to_string()),
        Value::String(entry.category.clone()),
        amount,
        Value::String(entry.note.clone()),
        Value::String(format_created_at(entry.created_at)),
    ]
}

/// The header as a writable row.
pub fn header_row() -> RowValues {
    HEADER.iter().map(|h| Value::String(h.to_string())).collect()
}

/// RFC 3339 UTC with milliseconds (`2024-03-05T04:10:00.000Z`).
pub fn format_created_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Renders a JSON cell value the way the sheet would display it.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn cell(cells: &[String], index: usize) -> &str {
    cells.get(index).map(|c| c.trim()).unwrap_or("")
}

fn parse_amount(text: &str) -> Option<Money> {
    if text.is_empty() {
        return None;
    }
    Money::parse_decimal(text)
}

fn parse_sheet_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

fn parse_created_at(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Decodes one data row (header excluded).
///
/// Returns `None` for rows that cannot name an entry: empty ID or an
/// unreadable date.
pub fn decode_row(cells: &[String]) -> Option<Entry> {
    let id = cell(cells, COL_ID);
    if id.is_empty() {
        debug!("Skipping row without an ID");
        return None;
    }

    let raw_date = cell(cells, COL_DATE);
    let Some(date) = parse_sheet_date(raw_date) else {
        warn!(id = %id, date = %raw_date, "Skipping row with unreadable date");
        return None;
    };

    let (amount, note_col, created_col) = match parse_amount(cell(cells, COL_AMOUNT)) {
        Some(amount) => (amount, COL_AMOUNT + 1, COL_AMOUNT + 2),
        None => match parse_amount(cell(cells, COL_AMOUNT + 1)) {
            Some(amount) => {
                debug!(id = %id, "Reading shifted row (amount one column right)");
                (amount, COL_AMOUNT + 2, COL_AMOUNT + 3)
            }
            None => (Money::zero(), COL_AMOUNT + 1, COL_AMOUNT + 2),
        },
    };

    Some(Entry {
        id: id.to_string(),
        date,
        entry_type: EntryType::from_label(cell(cells, COL_TYPE)),
        category: cell(cells, COL_CATEGORY).to_string(),
        amount: amount.abs(),
        note: cell(cells, note_col).to_string(),
        created_at: parse_created_at(cell(cells, created_col)).unwrap_or_else(Utc::now),
        synced: true,
    })
}

/// Decodes all data rows, dropping the undecodable ones.
pub fn decode_rows(rows: &[Vec<String>]) -> Vec<Entry> {
    let entries: Vec<Entry> = rows.iter().filter_map(|r| decode_row(r)).collect();
    if entries.len() < rows.len() {
        warn!(
            rows = rows.len(),
            decoded = entries.len(),
            "Some sheet rows were skipped"
        );
    }
    entries
}
