//! # Credentials
//!
//! The engine never runs an OAuth flow itself. It asks a
//! [`CredentialProvider`] for a bearer token right before each cycle and
//! stops with [`SyncError::Unauthenticated`](crate::SyncError::Unauthenticated)
//! when there is none.

use std::sync::RwLock;
use tracing::info;

use crate::config::LedgerConfig;

/// Supplies the bearer token for remote calls.
pub trait CredentialProvider: Send + Sync {
    fn is_authenticated(&self) -> bool {
        self.current_token().is_some()
    }

    /// The token to send, if signed in.
    fn current_token(&self) -> Option<String>;
}

/// In-memory session holding at most one token.
#[derive(Debug, Default)]
pub struct SessionCredentials {
    token: RwLock<Option<String>>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session already signed in with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.sign_in(token);
        session
    }

    /// A session seeded from `[sync] access_token` / `LEDGER_ACCESS_TOKEN`.
    pub fn from_config(config: &LedgerConfig) -> Self {
        match config.access_token() {
            Some(token) => Self::with_token(token),
            None => Self::new(),
        }
    }

    /// Stores a token. Blank tokens sign out.
    pub fn sign_in(&self, token: impl Into<String>) {
        let token = token.into().trim().to_string();
        let mut slot = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = if token.is_empty() { None } else { Some(token) };
        info!(signed_in = slot.is_some(), "Session updated");
    }

    pub fn sign_out(&self) {
        let mut slot = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
        info!("Signed out");
    }
}

impl CredentialProvider for SessionCredentials {
    fn current_token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_and_out() {
        let session = SessionCredentials::new();
        assert!(!session.is_authenticated());

        session.sign_in(" ya29.abc ");
        assert!(session.is_authenticated());
        assert_eq!(session.current_token().as_deref(), Some("ya29.abc"));

        session.sign_out();
        assert_eq!(session.current_token(), None);
    }

    #[test]
    fn test_blank_token_is_not_a_session() {
        let session = SessionCredentials::with_token("   ");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_from_config() {
        let mut config = LedgerConfig::default();
        assert!(!SessionCredentials::from_config(&config).is_authenticated());

        config.sync.access_token = Some("tok".to_string());
        let session = SessionCredentials::from_config(&config);
        assert_eq!(session.current_token().as_deref(), Some("tok"));
    }
}
