//! # Budget
//!
//! Monthly totals and the budget warning levels.
//!
//! ```text
//!   expense / budget
//!   ├── budget unset (0)   → Unset
//!   ├── ≤ 80%              → WithinBudget
//!   ├── > 80%, ≤ 100%      → NearLimit { percent }
//!   └── > 100%             → OverBudget { over_by }
//! ```

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{Entry, EntryType};

/// Percentage of the budget above which a month is "near the limit".
pub const NEAR_LIMIT_PERCENT: i64 = 80;

/// Income and expense totals for one month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub income: Money,
    pub expense: Money,
}

impl MonthSummary {
    /// Sums the given entries. Callers pass entries of a single month.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Self {
        entries
            .into_iter()
            .fold(MonthSummary::default(), |mut acc, e| {
                match e.entry_type {
                    EntryType::Income => acc.income += e.amount,
                    EntryType::Expense => acc.expense += e.amount,
                }
                acc
            })
    }

    /// Income minus expense. Can be negative.
    pub fn balance(&self) -> Money {
        self.income - self.expense
    }
}

/// Where the month's spending stands against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BudgetStatus {
    Unset,
    WithinBudget,
    NearLimit { percent: i64 },
    OverBudget { over_by: Money },
}

impl BudgetStatus {
    /// Evaluates `expense` against `budget`. A non-positive budget is unset.
    pub fn evaluate(budget: Money, expense: Money) -> Self {
        if budget.cents() <= 0 {
            return BudgetStatus::Unset;
        }
        if expense > budget {
            return BudgetStatus::OverBudget {
                over_by: expense - budget,
            };
        }
        // expense > 80% of budget, compared exactly in cents
        if expense.cents() as i128 * 100 > budget.cents() as i128 * NEAR_LIMIT_PERCENT as i128 {
            return BudgetStatus::NearLimit {
                percent: expense.percent_of(budget),
            };
        }
        BudgetStatus::WithinBudget
    }

    /// True for the states that deserve a warning.
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            BudgetStatus::NearLimit { .. } | BudgetStatus::OverBudget { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryDraft;
    use chrono::NaiveDate;

    fn entry(entry_type: EntryType, cents: i64) -> Entry {
        Entry::from_draft(EntryDraft {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            entry_type,
            category: "x".to_string(),
            amount: Money::from_cents(cents),
            note: None,
        })
    }

    #[test]
    fn test_summary_from_entries() {
        let entries = vec![
            entry(EntryType::Income, 5000000),
            entry(EntryType::Expense, 12000),
            entry(EntryType::Expense, 3050),
        ];
        let summary = MonthSummary::from_entries(&entries);
        assert_eq!(summary.income.cents(), 5000000);
        assert_eq!(summary.expense.cents(), 15050);
        assert_eq!(summary.balance().cents(), 4984950);
    }

    #[test]
    fn test_balance_can_go_negative() {
        let summary = MonthSummary {
            income: Money::from_cents(100),
            expense: Money::from_cents(300),
        };
        assert_eq!(summary.balance().cents(), -200);
    }

    #[test]
    fn test_budget_levels() {
        let budget = Money::from_cents(10000);

        assert_eq!(
            BudgetStatus::evaluate(Money::zero(), Money::from_cents(999)),
            BudgetStatus::Unset
        );
        assert_eq!(
            BudgetStatus::evaluate(budget, Money::from_cents(8000)),
            BudgetStatus::WithinBudget
        );
        assert_eq!(
            BudgetStatus::evaluate(budget, Money::from_cents(8001)),
            BudgetStatus::NearLimit { percent: 80 }
        );
        assert_eq!(
            BudgetStatus::evaluate(budget, Money::from_cents(10000)),
            BudgetStatus::NearLimit { percent: 100 }
        );
        assert_eq!(
            BudgetStatus::evaluate(budget, Money::from_cents(12500)),
            BudgetStatus::OverBudget {
                over_by: Money::from_cents(2500)
            }
        );
    }

    #[test]
    fn test_needs_attention() {
        assert!(!BudgetStatus::Unset.needs_attention());
        assert!(!BudgetStatus::WithinBudget.needs_attention());
        assert!(BudgetStatus::NearLimit { percent: 90 }.needs_attention());
    }
}
