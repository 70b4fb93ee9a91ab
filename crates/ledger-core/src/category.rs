//! # Categories
//!
//! Category labels with display icons. The ledger ships with a default set
//! per entry type; users may add and remove their own.
//!
//! Categories are a convenience for input, not a constraint: an entry's
//! category is free text and may name a category that no longer exists.

use serde::{Deserialize, Serialize};

use crate::types::EntryType;

/// Icon shown for a category nobody defined.
pub const DEFAULT_ICON: &str = "📦";

/// A named category with its icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub icon: String,
    pub entry_type: EntryType,
}

impl Category {
    pub fn new(name: impl Into<String>, icon: impl Into<String>, entry_type: EntryType) -> Self {
        Category {
            name: name.into(),
            icon: icon.into(),
            entry_type,
        }
    }
}

const DEFAULT_EXPENSE: &[(&str, &str)] = &[
    ("🍽️", "飲食"),
    ("🚗", "交通"),
    ("🛒", "購物"),
    ("🎮", "娛樂"),
    ("🏠", "居住"),
    ("💊", "醫療"),
    ("📚", "教育"),
    ("👔", "服飾"),
    ("📱", "通訊"),
    ("💡", "水電"),
    ("🎁", "禮物"),
    ("📦", "其他"),
];

const DEFAULT_INCOME: &[(&str, &str)] = &[
    ("💼", "薪資"),
    ("💰", "獎金"),
    ("📈", "投資"),
    ("🏦", "利息"),
    ("🎯", "副業"),
    ("📦", "其他收入"),
];

/// The categories a fresh ledger starts with, expenses first.
pub fn default_categories() -> Vec<Category> {
    let expense = DEFAULT_EXPENSE
        .iter()
        .map(|(icon, name)| Category::new(*name, *icon, EntryType::Expense));
    let income = DEFAULT_INCOME
        .iter()
        .map(|(icon, name)| Category::new(*name, *icon, EntryType::Income));
    expense.chain(income).collect()
}

/// Fallback category for a type when the user gave none.
pub fn fallback_category(entry_type: EntryType) -> &'static str {
    match entry_type {
        EntryType::Expense => "其他",
        EntryType::Income => "其他收入",
    }
}

/// Looks up the icon for `name` in `categories`, first match of any type.
pub fn icon_for<'a>(categories: &'a [Category], name: &str) -> &'a str {
    categories
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.icon.as_str())
        .unwrap_or(DEFAULT_ICON)
}
