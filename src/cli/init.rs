use colored::Colorize;

use crate::cli::open_db;
use crate::error::Result;
use crate::settings::{data_dir_overridden, get_data_dir, load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, owner: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(owner) = owner {
        settings.owner_name = owner.trim().to_string();
    }
    // Only file-backed values are written; COMPTES_DATA_DIR stays out of settings.json.
    save_settings(&settings)?;

    if data_dir_overridden() {
        tracing::info!("COMPTES_DATA_DIR is set; it takes precedence over settings.json");
    }

    let conn = open_db()?;
    let categories: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;

    println!(
        "{} at {} ({categories} categories)",
        "Initialized comptes".green(),
        get_data_dir().display()
    );
    Ok(())
}
