use comfy_table::{Cell, Table};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::importer::recent_batches;
use crate::settings::{db_path, get_data_dir, load_settings};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = db_path();

    println!("Owner:      {}", if settings.owner_name.is_empty() { "(not set)" } else { &settings.owner_name });
    println!("Data dir:   {}", get_data_dir().display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `comptes init` to set up.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };

    println!();
    println!("Themes:         {}", count("themes")?);
    println!("Categories:     {}", count("categories")?);
    println!("Subcategories:  {}", count("subcategories")?);
    println!("Transactions:   {}", count("transactions")?);
    println!("Imports:        {}", count("import_batches")?);

    let batches = recent_batches(&conn, 5)?;
    if !batches.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Batch", "File", "Rows", "Imported at", "Checksum"]);
        for batch in batches {
            table.add_row(vec![
                Cell::new(batch.id),
                Cell::new(batch.filename),
                Cell::new(batch.record_count),
                Cell::new(batch.imported_at),
                Cell::new(batch.checksum.as_deref().and_then(|c| c.get(..12)).unwrap_or("")),
            ]);
        }
        println!("\nRecent imports\n{table}");
    }
    Ok(())
}
