//! # Sync Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       SyncError Categories                              │
//! │                                                                         │
//! │  CONFIG        InvalidConfig, InvalidUrl, ConfigLoad/SaveFailed         │
//! │  AUTH          Unauthenticated (no token), Unauthorized (401)           │
//! │  TABLE         TableNotFound (404), Forbidden (403)                     │
//! │                  → the stored sheet id is discarded                     │
//! │  TRANSPORT     ConnectionFailed, Timeout, Api (429 / 5xx retryable)     │
//! │  PROTOCOL      MalformedResponse                                        │
//! │  LOCAL         Database                                                 │
//! │  ENGINE        AlreadyRunning, DeletionsFailed, Internal                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Sync error type covering all possible sync failures.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid API URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// No credential available. Raised before any network call.
    #[error("Not signed in: no access token available")]
    Unauthenticated,

    /// The remote rejected the credential (HTTP 401). The token is stale;
    /// the stored sheet id stays valid.
    #[error("Access token rejected: {0}")]
    Unauthorized(String),

    // =========================================================================
    // Remote Table Errors
    // =========================================================================
    /// The spreadsheet does not exist (HTTP 404).
    #[error("Spreadsheet not found: {0}")]
    TableNotFound(String),

    /// The spreadsheet exists but this account may not use it (HTTP 403).
    #[error("Access to spreadsheet denied: {0}")]
    Forbidden(String),

    /// Any other non-success API response.
    #[error("Sheets API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Could not reach the API.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request took longer than the configured timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The API answered with a body we could not understand.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// Local store failure.
    #[error("Database error: {0}")]
    Database(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// A cycle is already in progress (rejecting entry point only).
    #[error("A sync cycle is already running")]
    AlreadyRunning,

    /// Remote deletions failed while the rest of the push succeeded.
    /// The pending deletions are kept for the next push.
    #[error("Remote deletion failed ({pushed} changes pushed): {message}")]
    DeletionsFailed { message: String, pushed: usize },

    /// Internal engine error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ledger_db::DbError> for SyncError {
    fn from(err: ledger_db::DbError) -> Self {
        SyncError::Database(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::MalformedResponse(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if repeating the same request may succeed.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - HTTP 429 (rate limited) and 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => true,
            SyncError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the user has to (re)authenticate.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SyncError::Unauthenticated | SyncError::Unauthorized(_))
    }

    /// Returns true if the stored sheet id should be forgotten and a new
    /// spreadsheet created.
    pub fn discards_table(&self) -> bool {
        matches!(self, SyncError::TableNotFound(_) | SyncError::Forbidden(_))
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}
