//! # Ledger Configuration
//!
//! Settings for where the ledger lives and how it talks to the spreadsheet.
//!
//! ## Load Order (later overrides earlier)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Defaults (this file)                                               │
//! │  2. Config file  <config_dir>/ledger.toml                              │
//! │  3. Environment  LEDGER_DB_PATH, LEDGER_ACCESS_TOKEN,                  │
//! │                  LEDGER_SHEETS_URL, LEDGER_SYNC_MODE, LEDGER_AUTO_PUSH │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

pub const ENV_DB_PATH: &str = "LEDGER_DB_PATH";
pub const ENV_ACCESS_TOKEN: &str = "LEDGER_ACCESS_TOKEN";
pub const ENV_SHEETS_URL: &str = "LEDGER_SHEETS_URL";
pub const ENV_SYNC_MODE: &str = "LEDGER_SYNC_MODE";
pub const ENV_AUTO_PUSH: &str = "LEDGER_AUTO_PUSH";

// =============================================================================
// Sync Mode
// =============================================================================

/// Whether the ledger talks to the spreadsheet at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Pull and push when asked (and after edits if `auto_push`).
    #[default]
    Enabled,

    /// Local ledger only; sync commands refuse to run.
    Offline,
}

impl SyncMode {
    pub fn is_sync_enabled(&self) -> bool {
        matches!(self, SyncMode::Enabled)
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncMode::Enabled => write!(f, "enabled"),
            SyncMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for SyncMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enabled" | "on" | "online" => Ok(SyncMode::Enabled),
            "offline" | "disabled" | "off" => Ok(SyncMode::Offline),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown sync mode: '{}'. Valid options: enabled, offline",
                other
            ))),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the local ledger is stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. `None` uses `<data_dir>/ledger.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Sheets Settings
// =============================================================================

/// Spreadsheet API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsSettings {
    /// Base URL of the Sheets v4 REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Title given to a newly created spreadsheet.
    #[serde(default = "default_spreadsheet_title")]
    pub spreadsheet_title: String,

    /// Name of the tab holding the entries.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How many times an idempotent read is retried after a transient failure.
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Initial backoff duration (milliseconds) between read retries.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (seconds) between read retries.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com/v4/".to_string()
}
fn default_spreadsheet_title() -> String {
    "每日記帳".to_string()
}
fn default_sheet_name() -> String {
    "帳目".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_read_retries() -> u32 {
    3
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    10
}

impl Default for SheetsSettings {
    fn default() -> Self {
        SheetsSettings {
            api_base_url: default_api_base_url(),
            spreadsheet_title: default_spreadsheet_title(),
            sheet_name: default_sheet_name(),
            request_timeout_secs: default_request_timeout(),
            read_retries: default_read_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl SheetsSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// Same settings against another API root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default)]
    pub mode: SyncMode,

    /// Push right after every local add/edit/delete.
    #[serde(default = "default_true")]
    pub auto_push: bool,

    /// Bearer token for the Sheets API. Normally supplied through
    /// `LEDGER_ACCESS_TOKEN` rather than written to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            mode: SyncMode::default(),
            auto_push: true,
            access_token: None,
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete ledger configuration.
///
/// ## Example Config File
/// ```toml
/// [storage]
/// database_path = "/home/me/.local/share/ledger/ledger.db"
///
/// [sheets]
/// spreadsheet_title = "每日記帳"
/// sheet_name = "帳目"
/// request_timeout_secs = 30
/// read_retries = 3
///
/// [sync]
/// mode = "enabled"
/// auto_push = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub sheets: SheetsSettings,

    #[serde(default)]
    pub sync: SyncSettings,
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = url::Url::parse(&self.sheets.api_base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.sheets.api_base_url
            )));
        }

        if self.sheets.sheet_name.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "sheet_name must not be empty".into(),
            ));
        }

        if self.sheets.spreadsheet_title.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "spreadsheet_title must not be empty".into(),
            ));
        }

        if self.sheets.request_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = Some(PathBuf::from(path));
        }

        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            if !token.trim().is_empty() {
                debug!("Using access token from environment");
                self.sync.access_token = Some(token.trim().to_string());
            }
        }

        if let Some(url) = lookup(ENV_SHEETS_URL) {
            debug!(url = %url, "Overriding Sheets API URL from environment");
            self.sheets.api_base_url = url;
        }

        if let Some(mode) = lookup(ENV_SYNC_MODE) {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding sync mode from environment");
                    self.sync.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown sync mode in environment"),
            }
        }

        if let Some(flag) = lookup(ENV_AUTO_PUSH) {
            match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.sync.auto_push = true,
                "0" | "false" | "no" | "off" => self.sync.auto_push = false,
                _ => warn!(value = %flag, "Unknown auto push flag in environment"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "expense-ledger", "ledger")
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file to open: configured path, else the platform data dir,
    /// else `./ledger.db`.
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .or_else(|| Self::project_dirs().map(|dirs| dirs.data_dir().join("ledger.db")))
            .unwrap_or_else(|| PathBuf::from("ledger.db"))
    }

    pub fn mode(&self) -> SyncMode {
        self.sync.mode
    }

    pub fn is_sync_enabled(&self) -> bool {
        self.sync.mode.is_sync_enabled()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.sync.access_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sync_mode_parsing() {
        assert_eq!("enabled".parse::<SyncMode>().unwrap(), SyncMode::Enabled);
        assert_eq!("OFFLINE".parse::<SyncMode>().unwrap(), SyncMode::Offline);
        assert_eq!("off".parse::<SyncMode>().unwrap(), SyncMode::Offline);
        assert!("sometimes".parse::<SyncMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.sync.mode, SyncMode::Enabled);
        assert!(config.sync.auto_push);
        assert_eq!(config.sheets.spreadsheet_title, "每日記帳");
        assert_eq!(config.sheets.sheet_name, "帳目");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LedgerConfig::default();

        config.sheets.api_base_url = "ftp://sheets.example.com/".to_string();
        assert!(matches!(config.validate(), Err(SyncError::InvalidUrl(_))));

        config.sheets.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.sheets.api_base_url = "http://localhost:9000/v4/".to_string();
        assert!(config.validate().is_ok());

        config.sheets.sheet_name = "  ".to_string();
        assert!(config.validate().is_err());

        config.sheets.sheet_name = "Entries".to_string();
        config.sheets.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [sync]
            mode = "offline"
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.mode, SyncMode::Offline);
        assert!(config.sync.auto_push);
        assert_eq!(config.sheets.read_retries, 3);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/tmp/elsewhere.db"),
            (ENV_ACCESS_TOKEN, " ya29.token "),
            (ENV_SYNC_MODE, "offline"),
            (ENV_AUTO_PUSH, "false"),
        ]);

        let mut config = LedgerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path(), PathBuf::from("/tmp/elsewhere.db"));
        assert_eq!(config.access_token(), Some("ya29.token"));
        assert_eq!(config.mode(), SyncMode::Offline);
        assert!(!config.sync.auto_push);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("ledger.toml");

        let mut config = LedgerConfig::default();
        config.sheets.sheet_name = "Entries".to_string();
        config.sheets.read_retries = 5;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[sheets]"));
        assert!(!contents.contains("access_token"));

        let loaded: LedgerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.sheets.sheet_name, "Entries");
        assert_eq!(loaded.sheets.read_retries, 5);
    }
}
