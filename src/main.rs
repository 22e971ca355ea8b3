mod categorizer;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod settings;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use cli::transactions::TransactionFilter;
use cli::{AdminCommands, CategoriesCommands, Cli, Commands, ThemesCommands, TransactionsCommands};

fn main() {
    let filter = EnvFilter::try_from_env("COMPTES_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, owner } => cli::init::run(data_dir, owner),
        Commands::Import {
            file,
            dry_run,
            include_duplicates,
        } => cli::import::run(&file, dry_run, include_duplicates),
        Commands::Transactions { command } => match command {
            TransactionsCommands::List {
                year,
                month,
                category,
                limit,
                offset,
                json,
            } => cli::transactions::list(
                TransactionFilter {
                    year,
                    month,
                    category_id: category,
                    limit,
                    offset,
                },
                json,
            ),
            TransactionsCommands::Edit {
                id,
                label,
                note,
                category,
                subcategory,
            } => cli::transactions::edit(id, &label, note.as_deref(), category, subcategory),
            TransactionsCommands::Delete { ids } => cli::transactions::delete(&ids),
        },
        Commands::Themes { command } => match command {
            ThemesCommands::List => cli::themes::list(),
            ThemesCommands::Add { name, order } => cli::themes::add(&name, order),
            ThemesCommands::Edit { id, name, order } => cli::themes::edit(id, &name, order),
            ThemesCommands::Delete { id } => cli::themes::delete(id),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::Add {
                name,
                theme,
                subcategories,
            } => cli::categories::add(&name, theme, &subcategories),
            CategoriesCommands::AddSub { name, category } => cli::categories::add_sub(&name, category),
            CategoriesCommands::DeleteSub { id } => cli::categories::delete_sub(id),
        },
        Commands::Admin { command } => match command {
            AdminCommands::PurgeTransactions => cli::admin::run_purge_transactions(),
            AdminCommands::PurgeCategories => cli::admin::run_purge_categories(),
            AdminCommands::PurgeAll => cli::admin::run_purge_all(),
            AdminCommands::ResetCategories => cli::admin::run_reset_categories(),
        },
        Commands::Status => cli::status::run(),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "comptes", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
