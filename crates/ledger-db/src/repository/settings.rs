//! # Settings Repository
//!
//! Small key/value state that must survive restarts.
//!
//! | key            | value                         |
//! |----------------|-------------------------------|
//! | `sheet_id`     | remote spreadsheet id         |
//! | `budget_cents` | monthly budget, integer cents |
//!
//! A missing row means "unset".

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use ledger_core::Money;

const SHEET_ID_KEY: &str = "sheet_id";
const BUDGET_KEY: &str = "budget_cents";

/// Repository for persisted settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Reads a raw setting.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Writes a raw setting, replacing any previous value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Removes a setting.
    pub async fn remove(&self, key: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The remote spreadsheet id, if one has been created or linked.
    pub async fn sheet_id(&self) -> DbResult<Option<String>> {
        Ok(self
            .get(SHEET_ID_KEY)
            .await?
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()))
    }

    pub async fn set_sheet_id(&self, id: &str) -> DbResult<()> {
        debug!(sheet_id = %id, "Storing sheet id");
        self.set(SHEET_ID_KEY, id.trim()).await
    }

    pub async fn clear_sheet_id(&self) -> DbResult<()> {
        debug!("Clearing sheet id");
        self.remove(SHEET_ID_KEY).await
    }

    /// The monthly budget; zero when unset.
    pub async fn budget(&self) -> DbResult<Money> {
        let Some(raw) = self.get(BUDGET_KEY).await? else {
            return Ok(Money::zero());
        };

        match raw.trim().parse::<i64>() {
            Ok(cents) if cents > 0 => Ok(Money::from_cents(cents)),
            Ok(_) => Ok(Money::zero()),
            Err(_) => {
                warn!(value = %raw, "Ignoring unreadable budget setting");
                Ok(Money::zero())
            }
        }
    }

    /// Sets the monthly budget. Zero (or less) clears it.
    pub async fn set_budget(&self, budget: Money) -> DbResult<()> {
        if budget.cents() <= 0 {
            return self.remove(BUDGET_KEY).await;
        }
        self.set(BUDGET_KEY, &budget.cents().to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> SettingsRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().settings()
    }

    #[tokio::test]
    async fn test_sheet_id_round_trip() {
        let repo = repo().await;
        assert_eq!(repo.sheet_id().await.unwrap(), None);

        repo.set_sheet_id(" abc123 ").await.unwrap();
        assert_eq!(repo.sheet_id().await.unwrap().as_deref(), Some("abc123"));

        repo.set_sheet_id("def456").await.unwrap();
        assert_eq!(repo.sheet_id().await.unwrap().as_deref(), Some("def456"));

        repo.clear_sheet_id().await.unwrap();
        assert_eq!(repo.sheet_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_budget_defaults_to_zero() {
        let repo = repo().await;
        assert_eq!(repo.budget().await.unwrap(), Money::zero());

        repo.set_budget(Money::from_cents(2_000_000)).await.unwrap();
        assert_eq!(repo.budget().await.unwrap().cents(), 2_000_000);

        repo.set_budget(Money::zero()).await.unwrap();
        assert_eq!(repo.get(BUDGET_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_budget_is_unset() {
        let repo = repo().await;
        repo.set(BUDGET_KEY, "lots").await.unwrap();
        assert_eq!(repo.budget().await.unwrap(), Money::zero());
    }
}
