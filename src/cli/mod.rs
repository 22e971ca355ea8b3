pub mod admin;
pub mod categories;
pub mod import;
pub mod init;
pub mod status;
pub mod themes;
pub mod transactions;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{db_path, get_data_dir};

/// Open the configured database, creating the data directory and schema if needed.
pub(crate) fn open_db() -> Result<Connection> {
    std::fs::create_dir_all(get_data_dir())?;
    let conn = get_connection(&db_path())?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "comptes", about = "Personal budget tracker: bank CSV import, categories and themes.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for data (default: ~/Documents/comptes)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Name shown by `comptes status`
        #[arg(long)]
        owner: Option<String>,
    },
    /// Import a bank CSV export (semicolon-delimited, Latin-1).
    Import {
        /// Path to the CSV file
        file: String,
        /// Only report duplicates, write nothing
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Import rows duplicated in the file or already stored
        #[arg(long = "include-duplicates", conflicts_with = "dry_run")]
        include_duplicates: bool,
    },
    /// Browse and edit transactions.
    Transactions {
        #[command(subcommand)]
        command: TransactionsCommands,
    },
    /// Manage themes: the top-level grouping of categories.
    Themes {
        #[command(subcommand)]
        command: ThemesCommands,
    },
    /// Manage categories and subcategories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Bulk maintenance of stored data.
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    /// Show current database and summary statistics.
    Status,
    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List transactions, most recent first.
    List {
        #[arg(long)]
        year: Option<i32>,
        /// Month number, 1-12
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
        /// Category ID
        #[arg(long)]
        category: Option<i64>,
        #[arg(long, default_value = "100")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Edit the label, note and categorization of a transaction.
    Edit {
        id: i64,
        #[arg(long)]
        label: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        subcategory: Option<i64>,
    },
    /// Delete one or more transactions by ID.
    Delete {
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum ThemesCommands {
    /// List themes in display order.
    List,
    /// Add a theme.
    Add {
        name: String,
        /// Display order (default: after the last theme)
        #[arg(long)]
        order: Option<i64>,
    },
    /// Rename or reorder a theme.
    Edit {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Delete a theme with its categories and subcategories.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Show themes with their categories and subcategories.
    List,
    /// Add a category under a theme.
    Add {
        name: String,
        /// Theme ID
        #[arg(long)]
        theme: i64,
        /// Subcategory names to create with it
        #[arg(long = "sub", value_delimiter = ',')]
        subcategories: Vec<String>,
    },
    /// Add a subcategory to a category.
    AddSub {
        name: String,
        /// Category ID
        #[arg(long)]
        category: i64,
    },
    /// Delete a subcategory by ID.
    DeleteSub {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Delete every transaction and import batch.
    PurgeTransactions,
    /// Delete every category and subcategory.
    PurgeCategories,
    /// Delete transactions, import batches, categories and subcategories.
    PurgeAll,
    /// Drop custom categories and restore the defaults.
    ResetCategories,
}
