//! # CLI Error Type
//!
//! Every command returns `Result<(), CliError>`; `main` prints the message
//! and exits with the code of its category.
//!
//! ```text
//!   DbError ──────┐
//!   SyncError ────┼──► CliError ──► "error: <message>"  exit <code>
//!   CoreError ────┘
//! ```

use thiserror::Error;

use ledger_core::CoreError;
use ledger_db::DbError;
use ledger_sync::SyncError;

pub type CliResult<T> = Result<T, CliError>;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Bad input or unknown id (1)
    Usage = 1,
    /// Local database problem (2)
    Database = 2,
    /// Sync failed (3)
    Sync = 3,
    /// Configuration problem (4)
    Config = 4,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Invalid(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("database: {0}")]
    Database(String),

    #[error("sync: {0}")]
    Sync(SyncError),

    #[error("config: {0}")]
    Config(String),
}

impl CliError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CliError::Invalid(message.into())
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Invalid(_) | CliError::NotFound { .. } => ExitCode::Usage,
            CliError::Database(_) => ExitCode::Database,
            CliError::Sync(_) => ExitCode::Sync,
            CliError::Config(_) => ExitCode::Config,
        }
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CliError::NotFound { entity, id },
            DbError::UniqueViolation { .. } | DbError::Invalid(_) => {
                CliError::Invalid(err.to_string())
            }
            other => CliError::Database(other.to_string()),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        CliError::Invalid(err.to_string())
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        if err.is_config_error() {
            CliError::Config(err.to_string())
        } else {
            CliError::Sync(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_usage_error() {
        let err: CliError = DbError::not_found("Entry", "abc").into();
        assert_eq!(err.exit_code(), ExitCode::Usage);
        assert_eq!(err.to_string(), "Entry not found: abc");
    }

    #[test]
    fn test_sync_errors_keep_category() {
        let err: CliError = SyncError::Unauthenticated.into();
        assert_eq!(err.exit_code(), ExitCode::Sync);

        let err: CliError = SyncError::InvalidUrl("ftp://x".into()).into();
        assert_eq!(err.exit_code(), ExitCode::Config);
    }
}
