//! # Application State
//!
//! Everything a command needs, built once in `main`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            AppState                                     │
//! │                                                                         │
//! │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────────┐    │
//! │  │  LedgerConfig    │ │    Database      │ │     SyncEngine       │    │
//! │  │                  │ │                  │ │                      │    │
//! │  │  file + env      │ │  SQLite (WAL)    │ │  SheetsClient        │    │
//! │  │  --offline       │ │  repositories    │ │  SessionCredentials  │    │
//! │  └──────────────────┘ └──────────────────┘ └──────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use ledger_db::{Database, DbConfig};
use ledger_sync::{
    CredentialProvider, LedgerConfig, SessionCredentials, SheetsClient, SyncEngine,
};

use crate::error::{CliError, CliResult};

pub struct AppState {
    pub config: LedgerConfig,
    pub db: Database,
    pub credentials: Arc<SessionCredentials>,
    pub engine: SyncEngine,
    offline: bool,
}

impl AppState {
    /// Loads configuration, opens the ledger and wires the engine.
    pub async fn open(config_path: Option<PathBuf>, offline: bool) -> CliResult<Self> {
        let config = LedgerConfig::load(config_path)?;

        let db_path = config.database_path();
        info!(path = %db_path.display(), "Opening ledger");
        let db = Database::new(DbConfig::new(db_path)).await?;

        Self::with_database(config, db, offline)
    }

    pub fn with_database(config: LedgerConfig, db: Database, offline: bool) -> CliResult<Self> {
        let remote = Arc::new(SheetsClient::new(&config.sheets)?);
        let credentials = Arc::new(SessionCredentials::from_config(&config));
        let engine = SyncEngine::new(db.clone(), remote, credentials.clone());

        Ok(AppState {
            config,
            db,
            credentials,
            engine,
            offline,
        })
    }

    /// True when sync is allowed by config and flags.
    pub fn sync_enabled(&self) -> bool {
        !self.offline && self.config.is_sync_enabled()
    }

    /// True when an edit should be pushed right away.
    pub fn should_auto_push(&self) -> bool {
        self.sync_enabled() && self.config.sync.auto_push && self.credentials.is_authenticated()
    }

    /// Fails unless sync may run.
    pub fn require_sync(&self) -> CliResult<()> {
        if self.sync_enabled() {
            Ok(())
        } else {
            Err(CliError::invalid(
                "sync is off (offline mode); set [sync] mode = \"enabled\" or drop --offline",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_sync::SyncMode;

    async fn state(config: LedgerConfig, offline: bool) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::with_database(config, db, offline).unwrap()
    }

    #[tokio::test]
    async fn test_auto_push_needs_token_and_mode() {
        let mut config = LedgerConfig::default();
        assert!(!state(config.clone(), false).await.should_auto_push());

        config.sync.access_token = Some("tok".into());
        assert!(state(config.clone(), false).await.should_auto_push());
        assert!(!state(config.clone(), true).await.should_auto_push());

        config.sync.mode = SyncMode::Offline;
        let offline = state(config, false).await;
        assert!(!offline.should_auto_push());
        assert!(offline.require_sync().is_err());
    }
}
