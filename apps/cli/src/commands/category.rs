//! Category commands.

use ledger_core::category::DEFAULT_ICON;
use ledger_core::{Category, EntryType};

use crate::cli::CategoryAction;
use crate::error::CliResult;
use crate::state::AppState;

pub async fn run(state: &AppState, action: CategoryAction) -> CliResult<()> {
    let categories = state.db.categories();
    match action {
        CategoryAction::List { entry_type } => {
            let list = match entry_type {
                Some(t) => categories.list_by_type(t).await?,
                None => categories.list().await?,
            };
            print_grouped(&list);
        }
        CategoryAction::Add {
            name,
            entry_type,
            icon,
        } => {
            let category = Category::new(
                name,
                icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
                entry_type,
            );
            categories.add(&category).await?;
            println!(
                "Added {} {} ({})",
                category.icon,
                category.name,
                category.entry_type.label()
            );
        }
        CategoryAction::Remove { name, entry_type } => {
            categories.remove(&name, entry_type).await?;
            println!("Removed {} ({})", name.trim(), entry_type.label());
        }
        CategoryAction::Reset => {
            categories.reset_to_defaults().await?;
            println!("Categories restored to defaults");
        }
    }
    Ok(())
}

fn print_grouped(list: &[Category]) {
    for entry_type in [EntryType::Expense, EntryType::Income] {
        let mut of_type = list.iter().filter(|c| c.entry_type == entry_type).peekable();
        if of_type.peek().is_none() {
            continue;
        }
        println!("{}", entry_type.label());
        for category in of_type {
            println!("  {} {}", category.icon, category.name);
        }
    }
}
