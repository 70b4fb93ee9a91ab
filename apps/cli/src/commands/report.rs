//! Monthly summary and budget commands.

use ledger_core::{BudgetStatus, Money, MonthSummary, YearMonth};

use crate::cli::BudgetAction;
use crate::error::CliResult;
use crate::state::AppState;

pub async fn summary(state: &AppState, month: Option<YearMonth>) -> CliResult<()> {
    let month = month.unwrap_or_else(YearMonth::current);
    let totals = state.db.entries().month_summary(month).await?;
    let budget = state.db.settings().budget().await?;

    for line in render_summary(month, &totals, budget) {
        println!("{}", line);
    }
    Ok(())
}

pub async fn budget(state: &AppState, action: BudgetAction) -> CliResult<()> {
    let settings = state.db.settings();
    match action {
        BudgetAction::Set { amount } => {
            settings.set_budget(amount).await?;
            if amount.is_zero() {
                println!("Monthly budget cleared");
            } else {
                println!("Monthly budget set to {}", amount);
            }
        }
        BudgetAction::Show => {
            let amount = settings.budget().await?;
            if amount.is_zero() {
                println!("No monthly budget set");
            } else {
                println!("Monthly budget: {}", amount);
            }
        }
    }
    Ok(())
}

fn render_summary(month: YearMonth, totals: &MonthSummary, budget: Money) -> Vec<String> {
    let mut lines = vec![
        format!("{}", month),
        format!("  Income   {}", totals.income),
        format!("  Expense  {}", totals.expense),
        format!("  Balance  {}", totals.balance()),
    ];

    let status = BudgetStatus::evaluate(budget, totals.expense);
    let budget_line = match status {
        BudgetStatus::Unset => None,
        BudgetStatus::WithinBudget => Some(format!(
            "  Budget   {} ({} left)",
            budget,
            budget - totals.expense
        )),
        BudgetStatus::NearLimit { percent } => Some(format!(
            "  Budget   {} ! {}% used",
            budget, percent
        )),
        BudgetStatus::OverBudget { over_by } => Some(format!(
            "  Budget   {} ! over by {}",
            budget, over_by
        )),
    };
    lines.extend(budget_line);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(income: i64, expense: i64) -> MonthSummary {
        MonthSummary {
            income: Money::from_major(income),
            expense: Money::from_major(expense),
        }
    }

    fn month() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    #[test]
    fn test_summary_without_budget_has_no_budget_line() {
        let lines = render_summary(month(), &totals(1000, 400), Money::zero());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "2024-03");
        assert_eq!(lines[3], "  Balance  $600.00");
    }

    #[test]
    fn test_summary_budget_states() {
        let within = render_summary(month(), &totals(0, 100), Money::from_major(1000));
        assert_eq!(within[4], "  Budget   $1,000.00 ($900.00 left)");

        let near = render_summary(month(), &totals(0, 850), Money::from_major(1000));
        assert_eq!(near[4], "  Budget   $1,000.00 ! 85% used");

        let over = render_summary(month(), &totals(0, 1200), Money::from_major(1000));
        assert_eq!(over[4], "  Budget   $1,000.00 ! over by $200.00");
    }
}
