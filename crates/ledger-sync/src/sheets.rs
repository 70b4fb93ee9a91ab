//! # Google Sheets Client
//!
//! [`RemoteTable`] over the Sheets v4 REST API.
//!
//! ## Requests
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ open             │ GET  spreadsheets/{id}?fields=spreadsheetId          │
//! │ create           │ POST spreadsheets                                    │
//! │                  │ PUT  values/{sheet}!A1:G1          (header)          │
//! │                  │ POST {id}:batchUpdate              (bold header)     │
//! │ read_id_column   │ GET  values/{sheet}!A:A                              │
//! │ read_rows        │ GET  values/{sheet}!A2:H                             │
//! │ append_rows      │ POST values/{sheet}!A:G:append                       │
//! │ update_row       │ PUT  values/{sheet}!A{n}:G{n}                        │
//! │ delete_rows      │ GET  spreadsheets/{id}?fields=sheets.properties      │
//! │                  │ POST {id}:batchUpdate              (deleteDimension) │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Retries
//! Reads are retried with exponential backoff on connection failures,
//! timeouts, 429 and 5xx. Writes are sent once: a retried append could
//! duplicate rows.

use std::future::Future;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SheetsSettings;
use crate::error::{SyncError, SyncResult};
use crate::remote::{deletion_order, RemoteTable};
use crate::row::{cell_text, header_row, RowValues, COLUMN_COUNT};

/// Last column written by the codec (G).
const LAST_COLUMN: char = (b'A' + COLUMN_COUNT as u8 - 1) as char;

// =============================================================================
// Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetSheets {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

// =============================================================================
// Client
// =============================================================================

/// Sheets API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    settings: SheetsSettings,
}

impl SheetsClient {
    /// Builds a client from validated settings.
    pub fn new(settings: &SheetsSettings) -> SyncResult<Self> {
        let base_url = Url::parse(&settings.api_base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(settings.api_base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            settings: settings.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn values_endpoint(&self, table_id: &str, range: &str) -> SyncResult<Url> {
        self.endpoint(&["spreadsheets", table_id, "values", range])
    }

    fn batch_update_endpoint(&self, table_id: &str) -> SyncResult<Url> {
        let action = format!("{}:batchUpdate", table_id);
        self.endpoint(&["spreadsheets", &action])
    }

    fn range(&self, cells: &str) -> String {
        format!("{}!{}", self.settings.sheet_name, cells)
    }

    fn row_range(&self, row_index: usize) -> String {
        // Sheets rows are 1-based
        let n = row_index + 1;
        self.range(&format!("A{}:{}{}", n, LAST_COLUMN, n))
    }

    // =========================================================================
    // Transport
    // =========================================================================

    async fn send(&self, request: RequestBuilder, table_id: &str) -> SyncResult<Response> {
        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response, table_id).await)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        table_id: &str,
    ) -> SyncResult<T> {
        let response = self.send(request, table_id).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.settings.request_timeout_secs)
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.settings.initial_backoff(),
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs a read, retrying transient failures.
    async fn with_read_retries<T, F, Fut>(&self, what: &str, mut read: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0u32;

        loop {
            match read().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.settings.read_retries => {
                    attempt += 1;
                    let delay = backoff
                        .next_backoff()
                        .unwrap_or_else(|| self.settings.max_backoff());
                    warn!(
                        what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Sheets read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn read_values(&self, token: &str, table_id: &str, range: &str) -> SyncResult<Vec<Vec<String>>> {
        let url = self.values_endpoint(table_id, range)?;
        let body: ValueRange = self
            .with_read_retries(range, || {
                self.send_json(self.http.get(url.clone()).bearer_auth(token), table_id)
            })
            .await?;

        Ok(body
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn put_values(
        &self,
        token: &str,
        table_id: &str,
        range: &str,
        rows: &[RowValues],
    ) -> SyncResult<()> {
        let mut url = self.values_endpoint(table_id, range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        self.send(self.http.put(url).bearer_auth(token).json(&body), table_id)
            .await?;
        Ok(())
    }

    async fn batch_update(&self, token: &str, table_id: &str, requests: Vec<Value>) -> SyncResult<()> {
        let url = self.batch_update_endpoint(table_id)?;
        let body = json!({ "requests": requests });
        self.send(self.http.post(url).bearer_auth(token).json(&body), table_id)
            .await?;
        Ok(())
    }

    /// Numeric id of the entries tab, falling back to the first tab.
    async fn tab_id(&self, token: &str, table_id: &str) -> SyncResult<i64> {
        let mut url = self.endpoint(&["spreadsheets", table_id])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");

        let body: SpreadsheetSheets = self
            .with_read_retries("sheets.properties", || {
                self.send_json(self.http.get(url.clone()).bearer_auth(token), table_id)
            })
            .await?;

        let named = body
            .sheets
            .iter()
            .find(|s| s.properties.title == self.settings.sheet_name);
        named
            .or_else(|| body.sheets.first())
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| SyncError::MalformedResponse("spreadsheet has no sheets".into()))
    }
}

/// Maps a non-success response to an error.
async fn status_error(response: Response, table_id: &str) -> SyncError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or(text);

    match status {
        401 => SyncError::Unauthorized(message),
        403 => SyncError::Forbidden(table_id.to_string()),
        404 => SyncError::TableNotFound(table_id.to_string()),
        _ => SyncError::Api { status, message },
    }
}

#[async_trait]
impl RemoteTable for SheetsClient {
    async fn open(&self, token: &str, table_id: &str) -> SyncResult<()> {
        let mut url = self.endpoint(&["spreadsheets", table_id])?;
        url.query_pairs_mut().append_pair("fields", "spreadsheetId");

        self.with_read_retries("open", || {
            self.send(self.http.get(url.clone()).bearer_auth(token), table_id)
        })
        .await?;
        debug!(table_id, "Spreadsheet opened");
        Ok(())
    }

    async fn create(&self, token: &str) -> SyncResult<String> {
        let url = self.endpoint(&["spreadsheets"])?;
        let body = json!({
            "properties": { "title": self.settings.spreadsheet_title },
            "sheets": [{
                "properties": {
                    "title": self.settings.sheet_name,
                    "gridProperties": { "frozenRowCount": 1 }
                }
            }]
        });

        let created: CreatedSpreadsheet = self
            .send_json(self.http.post(url).bearer_auth(token).json(&body), "")
            .await?;
        let table_id = created.spreadsheet_id;
        info!(table_id = %table_id, title = %self.settings.spreadsheet_title, "Spreadsheet created");

        let header_range = self.row_range(0);
        self.put_values(token, &table_id, &header_range, &[header_row()])
            .await?;

        // Cosmetic; the table is usable without it
        let bold_header = json!({
            "repeatCell": {
                "range": { "sheetId": 0, "startRowIndex": 0, "endRowIndex": 1 },
                "cell": { "userEnteredFormat": { "textFormat": { "bold": true } } },
                "fields": "userEnteredFormat.textFormat.bold"
            }
        });
        if let Err(err) = self.batch_update(token, &table_id, vec![bold_header]).await {
            warn!(table_id = %table_id, error = %err, "Could not format header row");
        }

        Ok(table_id)
    }

    async fn read_id_column(&self, token: &str, table_id: &str) -> SyncResult<Vec<String>> {
        let rows = self.read_values(token, table_id, &self.range("A:A")).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn read_rows(&self, token: &str, table_id: &str) -> SyncResult<Vec<Vec<String>>> {
        self.read_values(token, table_id, &self.range("A2:H")).await
    }

    async fn append_rows(&self, token: &str, table_id: &str, rows: &[RowValues]) -> SyncResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let range = self.range(&format!("A:{}", LAST_COLUMN));
        let action = format!("{}:append", range);
        let mut url = self.values_endpoint(table_id, &action)?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let body = json!({ "majorDimension": "ROWS", "values": rows });
        self.send(self.http.post(url).bearer_auth(token).json(&body), table_id)
            .await?;
        debug!(table_id, count = rows.len(), "Rows appended");
        Ok(())
    }

    async fn update_row(
        &self,
        token: &str,
        table_id: &str,
        row_index: usize,
        row: &RowValues,
    ) -> SyncResult<()> {
        if row_index == 0 {
            return Err(SyncError::Internal("refusing to overwrite header row".into()));
        }
        let range = self.row_range(row_index);
        self.put_values(token, table_id, &range, std::slice::from_ref(row))
            .await
    }

    async fn delete_rows(&self, token: &str, table_id: &str, row_indices: &[usize]) -> SyncResult<()> {
        let ordered = deletion_order(row_indices);
        if ordered.is_empty() {
            return Ok(());
        }

        let sheet_id = self.tab_id(token, table_id).await?;
        let requests = ordered
            .iter()
            .map(|&index| {
                json!({
                    "deleteDimension": {
                        "range": {
                            "sheetId": sheet_id,
                            "dimension": "ROWS",
                            "startIndex": index,
                            "endIndex": index + 1
                        }
                    }
                })
            })
            .collect();

        self.batch_update(token, table_id, requests).await?;
        debug!(table_id, rows = ?ordered, "Rows deleted");
        Ok(())
    }
}
