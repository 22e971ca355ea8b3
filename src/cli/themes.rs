use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::{Connection, OptionalExtension};

use crate::cli::categories::list_themes;
use crate::cli::open_db;
use crate::error::{ComptesError, Result};

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Theme", "Order", "Categories"]);
    for theme in list_themes(&conn)? {
        table.add_row(vec![
            Cell::new(theme.id),
            Cell::new(&theme.name),
            Cell::new(theme.display_order),
            Cell::new(theme.categories.len()),
        ]);
    }
    println!("Themes\n{table}");
    Ok(())
}

pub fn add(name: &str, display_order: Option<i64>) -> Result<()> {
    let conn = open_db()?;
    let id = add_theme(&conn, name, display_order)?;
    println!("{} {} (#{id})", "Added theme:".green(), name.trim());
    Ok(())
}

pub fn edit(id: i64, name: &str, display_order: Option<i64>) -> Result<()> {
    let conn = open_db()?;
    update_theme(&conn, id, name, display_order)?;
    println!("{} {id}", "Updated theme".green());
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = open_db()?;
    let categories = delete_theme(&conn, id)?;
    println!("{} {id} ({categories} categories removed)", "Deleted theme".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

/// Without an explicit order the theme goes last.
pub fn add_theme(conn: &Connection, name: &str, display_order: Option<i64>) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComptesError::Validation("Name is required".into()));
    }
    let display_order = match display_order {
        Some(order) => order,
        None => conn.query_row("SELECT coalesce(max(display_order), 0) + 1 FROM themes", [], |r| r.get(0))?,
    };
    conn.execute(
        "INSERT INTO themes (name, display_order) VALUES (?1, ?2)",
        rusqlite::params![name, display_order],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rename a theme; the display order only changes when one is given.
pub fn update_theme(conn: &Connection, id: i64, name: &str, display_order: Option<i64>) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComptesError::Validation("ID and name are required".into()));
    }
    let updated = conn.execute(
        "UPDATE themes SET name = ?1, display_order = coalesce(?2, display_order) WHERE id = ?3",
        rusqlite::params![name, display_order, id],
    )?;
    if updated == 0 {
        return Err(ComptesError::NotFound(format!("theme {id}")));
    }
    Ok(())
}

/// Delete a theme with its categories and their subcategories. Transactions
/// keep their rows with category links cleared. Returns the number of
/// categories removed.
pub fn delete_theme(conn: &Connection, id: i64) -> Result<i64> {
    let categories: Option<i64> = conn
        .query_row(
            "SELECT (SELECT count(*) FROM categories WHERE theme_id = t.id) FROM themes t WHERE t.id = ?1",
            [id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(categories) = categories else {
        return Err(ComptesError::NotFound(format!("theme {id}")));
    };
    conn.execute("DELETE FROM themes WHERE id = ?1", [id])?;
    tracing::info!(theme = id, categories, "deleted theme");
    Ok(categories)
}
