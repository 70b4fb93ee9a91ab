//! # Sync Events
//!
//! What the engine tells the outside world while it works.
//!
//! ```text
//!   sync_from_sheet / sync_to_sheet / full_sync
//!        │
//!        ├─► StatusChanged { Syncing, "pulling from sheet" }
//!        ├─► DataChanged   { added, removed, synced }
//!        └─► StatusChanged { Success | Idle | Error, message }
//! ```
//!
//! Events travel on a `tokio::sync::broadcast` channel; a slow or absent
//! subscriber never blocks a cycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Syncing,
    Success,
    Error,
    /// Nothing to do, or nothing changed.
    Idle,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Error => write!(f, "error"),
            SyncStatus::Idle => write!(f, "idle"),
        }
    }
}

/// Internal engine state, queryable at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Idle,
    Pulling,
    Pushing,
    /// The last cycle failed. The next cycle starts normally.
    Error,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Pulling => write!(f, "pulling"),
            EngineState::Pushing => write!(f, "pushing"),
            EngineState::Error => write!(f, "error"),
        }
    }
}

/// An event published by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    StatusChanged {
        status: SyncStatus,
        message: String,
        table_id: Option<String>,
    },
    /// The local ledger changed because of a sync step.
    DataChanged {
        added: usize,
        removed: usize,
        synced: usize,
    },
}

impl SyncEvent {
    pub fn status(status: SyncStatus, message: impl Into<String>, table_id: Option<&str>) -> Self {
        SyncEvent::StatusChanged {
            status,
            message: message.into(),
            table_id: table_id.map(str::to_string),
        }
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::StatusChanged {
                status, message, ..
            } => write!(f, "[{}] {}", status, message),
            SyncEvent::DataChanged {
                added,
                removed,
                synced,
            } => write!(
                f,
                "ledger changed: +{} added, -{} removed, {} synced",
                added, removed, synced
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let event = SyncEvent::status(SyncStatus::Idle, "already up to date", Some("abc"));
        assert_eq!(event.to_string(), "[idle] already up to date");

        let event = SyncEvent::DataChanged {
            added: 2,
            removed: 1,
            synced: 0,
        };
        assert_eq!(
            event.to_string(),
            "ledger changed: +2 added, -1 removed, 0 synced"
        );
    }

    #[test]
    fn test_event_json_shape() {
        let event = SyncEvent::status(SyncStatus::Success, "done", None);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "status_changed");
        assert_eq!(json["status"], "success");
    }
}
