//! # Category Repository
//!
//! The user's category list. Seeded with defaults by the initial migration.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use ledger_core::category::{default_categories, DEFAULT_ICON};
use ledger_core::validation::validate_category;
use ledger_core::{Category, EntryType};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    name: String,
    entry_type: String,
    icon: String,
}

impl TryFrom<CategoryRow> for Category {
    type Error = DbError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        let entry_type: EntryType = row
            .entry_type
            .parse()
            .map_err(|_| DbError::corrupt("entry_type", &row.name, &row.entry_type))?;
        Ok(Category::new(row.name, row.icon, entry_type))
    }
}

/// Repository for categories.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories in display order.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT name, entry_type, icon FROM categories ORDER BY position ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Category::try_from).collect()
    }

    /// Categories of one entry type in display order.
    pub async fn list_by_type(&self, entry_type: EntryType) -> DbResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT name, entry_type, icon FROM categories
            WHERE entry_type = ?1
            ORDER BY position ASC, name ASC
            "#,
        )
        .bind(entry_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Category::try_from).collect()
    }

    /// Adds a category at the end of the list.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - same name and type already exist
    pub async fn add(&self, category: &Category) -> DbResult<()> {
        validate_category(&category.name)?;
        let name = category.name.trim();
        let icon = if category.icon.trim().is_empty() {
            DEFAULT_ICON
        } else {
            category.icon.trim()
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO categories (name, entry_type, icon, position)
            VALUES (?1, ?2, ?3, (SELECT COALESCE(MAX(position), 0) + 1 FROM categories))
            ON CONFLICT (name, entry_type) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(category.entry_type.as_str())
        .bind(icon)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(DbError::duplicate("category", name));
        }

        debug!(name = %name, entry_type = %category.entry_type, "Added category");
        Ok(())
    }

    /// Removes a category. Existing entries keep their label.
    pub async fn remove(&self, name: &str, entry_type: EntryType) -> DbResult<()> {
        let removed = sqlx::query("DELETE FROM categories WHERE name = ?1 AND entry_type = ?2")
            .bind(name.trim())
            .bind(entry_type.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(DbError::not_found("Category", name));
        }
        Ok(())
    }

    /// Icon for a category name of any type, `📦` when unknown.
    pub async fn icon_for(&self, name: &str) -> DbResult<String> {
        let icon = sqlx::query_scalar::<_, String>(
            "SELECT icon FROM categories WHERE name = ?1 ORDER BY position ASC LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(icon.unwrap_or_else(|| DEFAULT_ICON.to_string()))
    }

    /// Replaces the list with the default categories.
    pub async fn reset_to_defaults(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM categories").execute(&mut *tx).await?;
        for (position, category) in default_categories().iter().enumerate() {
            sqlx::query(
                "INSERT INTO categories (name, entry_type, icon, position) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&category.name)
            .bind(category.entry_type.as_str())
            .bind(&category.icon)
            .bind(position as i64 + 1)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> CategoryRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().categories()
    }

    #[tokio::test]
    async fn test_seeded_with_defaults() {
        let repo = repo().await;
        let all = repo.list().await.unwrap();
        assert_eq!(all, default_categories());

        let income = repo.list_by_type(EntryType::Income).await.unwrap();
        assert_eq!(income.len(), 6);
        assert_eq!(income[0].name, "薪資");
    }

    #[tokio::test]
    async fn test_add_rejects_duplicates_per_type() {
        let repo = repo().await;
        repo.add(&Category::new("寵物", "🐶", EntryType::Expense))
            .await
            .unwrap();

        let dup = repo
            .add(&Category::new("寵物", "🐱", EntryType::Expense))
            .await;
        assert!(matches!(dup, Err(DbError::UniqueViolation { .. })));

        // Same name under the other type is a different category
        repo.add(&Category::new("寵物", "🐶", EntryType::Income))
            .await
            .unwrap();

        let expense = repo.list_by_type(EntryType::Expense).await.unwrap();
        assert_eq!(expense.last().unwrap().name, "寵物");
    }

    #[tokio::test]
    async fn test_remove_and_icon_fallback() {
        let repo = repo().await;
        assert_eq!(repo.icon_for("交通").await.unwrap(), "🚗");

        repo.remove("交通", EntryType::Expense).await.unwrap();
        assert_eq!(repo.icon_for("交通").await.unwrap(), DEFAULT_ICON);

        assert!(matches!(
            repo.remove("交通", EntryType::Expense).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_to_defaults() {
        let repo = repo().await;
        repo.remove("飲食", EntryType::Expense).await.unwrap();
        repo.add(&Category::new("寵物", "", EntryType::Expense))
            .await
            .unwrap();
        assert_eq!(repo.icon_for("寵物").await.unwrap(), DEFAULT_ICON);

        repo.reset_to_defaults().await.unwrap();
        assert_eq!(repo.list().await.unwrap(), default_categories());
    }
}
