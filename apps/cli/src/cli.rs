//! CLI argument parsing using clap derive

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use ledger_core::{parse_date, EntryType, Money, YearMonth};

/// Personal expense ledger with Google Sheets sync
#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Never contact the spreadsheet, whatever the config says
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Record a new expense or income
    ///
    /// Examples:
    ///   ledger add 120.5 飲食
    ///   ledger add 50000 薪資 --type income --date 2024-03-05 --note 三月
    Add {
        /// Amount, e.g. 120.5 or "1,250"
        #[arg(value_parser = parse_amount)]
        amount: Money,

        /// Category label
        category: String,

        #[arg(short = 't', long = "type", default_value = "expense", value_parser = parse_entry_type)]
        entry_type: EntryType,

        /// Date (YYYY-MM-DD), today when omitted
        #[arg(short, long, value_parser = parse_day)]
        date: Option<NaiveDate>,

        #[arg(short, long)]
        note: Option<String>,
    },

    /// Change fields of an entry
    Edit {
        id: String,

        #[command(flatten)]
        fields: EditFields,
    },

    /// Delete an entry (also removed from the sheet on the next push)
    Delete { id: String },

    /// List entries, newest first
    List {
        /// Only this month (YYYY-MM)
        #[arg(short, long, value_parser = parse_month)]
        month: Option<YearMonth>,

        #[arg(short = 't', long = "type", value_parser = parse_entry_type)]
        entry_type: Option<EntryType>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Income, expense and budget for a month
    Summary {
        /// Month (YYYY-MM), current month when omitted
        #[arg(short, long, value_parser = parse_month)]
        month: Option<YearMonth>,
    },

    /// Monthly budget
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Reconcile with the spreadsheet
    Sync {
        #[command(subcommand)]
        direction: Option<SyncDirection>,
    },

    /// Show local and sync status
    Status,
}

/// Fields `edit` may change. At least one is required.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = true)]
pub struct EditFields {
    #[arg(short, long, value_parser = parse_amount)]
    pub amount: Option<Money>,

    #[arg(short, long)]
    pub category: Option<String>,

    #[arg(short = 't', long = "type", value_parser = parse_entry_type)]
    pub entry_type: Option<EntryType>,

    #[arg(short, long, value_parser = parse_day)]
    pub date: Option<NaiveDate>,

    #[arg(short, long)]
    pub note: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BudgetAction {
    /// Set the monthly budget (0 clears it)
    Set {
        #[arg(value_parser = parse_amount)]
        amount: Money,
    },
    /// Show the monthly budget
    Show,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CategoryAction {
    /// List categories with their icons
    List {
        #[arg(short = 't', long = "type", value_parser = parse_entry_type)]
        entry_type: Option<EntryType>,
    },
    /// Add a category
    Add {
        name: String,

        #[arg(short = 't', long = "type", default_value = "expense", value_parser = parse_entry_type)]
        entry_type: EntryType,

        #[arg(short, long)]
        icon: Option<String>,
    },
    /// Remove a category (entries keep their label)
    Remove {
        name: String,

        #[arg(short = 't', long = "type", default_value = "expense", value_parser = parse_entry_type)]
        entry_type: EntryType,
    },
    /// Restore the default categories
    Reset,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncDirection {
    /// Sheet to ledger
    Pull,
    /// Ledger to sheet
    Push,
    /// Pull then push
    #[default]
    Full,
}

// =============================================================================
// Value Parsers
// =============================================================================

fn parse_amount(s: &str) -> Result<Money, String> {
    match Money::parse_decimal(s) {
        Some(amount) if !amount.is_negative() => Ok(amount),
        Some(_) => Err("amount must not be negative".to_string()),
        None => Err(format!("not an amount: {}", s)),
    }
}

fn parse_entry_type(s: &str) -> Result<EntryType, String> {
    s.parse().map_err(|e: ledger_core::CoreError| e.to_string())
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn parse_month(s: &str) -> Result<YearMonth, String> {
    s.parse().map_err(|e: ledger_core::CoreError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_add_defaults() {
        let cli = Cli::parse_from(["ledger", "add", "120.5", "飲食"]);
        assert_eq!(
            cli.command,
            Commands::Add {
                amount: Money::from_cents(12050),
                category: "飲食".to_string(),
                entry_type: EntryType::Expense,
                date: None,
                note: None,
            }
        );
        assert!(!cli.offline);
    }

    #[test]
    fn parse_add_income_with_label() {
        let cli = Cli::parse_from([
            "ledger", "add", "50,000", "薪資", "--type", "收入", "--date", "2024-03-05",
        ]);
        match cli.command {
            Commands::Add {
                amount,
                entry_type,
                date,
                ..
            } => {
                assert_eq!(amount, Money::from_cents(5_000_000));
                assert_eq!(entry_type, EntryType::Income);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_negative_amount() {
        assert!(Cli::try_parse_from(["ledger", "add", "--", "-5", "飲食"]).is_err());
    }

    #[test]
    fn parse_edit_requires_a_field() {
        assert!(Cli::try_parse_from(["ledger", "edit", "abc"]).is_err());

        let cli = Cli::parse_from(["ledger", "edit", "abc", "--note", "晚餐"]);
        match cli.command {
            Commands::Edit { id, fields } => {
                assert_eq!(id, "abc");
                assert_eq!(fields.note.as_deref(), Some("晚餐"));
                assert!(fields.amount.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_list_filters() {
        let cli = Cli::parse_from(["ledger", "list", "--month", "2024-02", "-t", "income"]);
        assert_eq!(
            cli.command,
            Commands::List {
                month: Some(YearMonth::new(2024, 2).unwrap()),
                entry_type: Some(EntryType::Income),
                json: false,
            }
        );
        assert!(Cli::try_parse_from(["ledger", "list", "--month", "2024-13"]).is_err());
    }

    #[test]
    fn parse_sync_directions() {
        let cli = Cli::parse_from(["ledger", "sync"]);
        assert_eq!(cli.command, Commands::Sync { direction: None });

        let cli = Cli::parse_from(["ledger", "--offline", "sync", "push"]);
        assert!(cli.offline);
        assert_eq!(
            cli.command,
            Commands::Sync {
                direction: Some(SyncDirection::Push)
            }
        );
    }
}
