use colored::Colorize;
use rusqlite::Connection;

use crate::cli::open_db;
use crate::db::{seed_categories, seed_themes};
use crate::error::Result;

pub fn run_purge_transactions() -> Result<()> {
    let conn = open_db()?;
    let removed = purge_transactions(&conn)?;
    println!("{} {removed} transaction(s) and all import batches", "Purged".green());
    Ok(())
}

pub fn run_purge_categories() -> Result<()> {
    let conn = open_db()?;
    let removed = purge_categories(&conn)?;
    println!("{} {removed} categories and their subcategories", "Purged".green());
    Ok(())
}

pub fn run_purge_all() -> Result<()> {
    let conn = open_db()?;
    purge_all(&conn)?;
    println!("{}", "Purged transactions, import batches and categories".green());
    Ok(())
}

pub fn run_reset_categories() -> Result<()> {
    let conn = open_db()?;
    reset_categories(&conn)?;
    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0))?;
    println!("{} ({count} categories)", "Categories reset to defaults".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

/// Returns the number of transactions removed.
pub fn purge_transactions(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let removed = tx.execute("DELETE FROM transactions", [])?;
    tx.execute("DELETE FROM import_batches", [])?;
    tx.commit()?;
    tracing::info!(removed, "purged transactions");
    Ok(removed)
}

/// Returns the number of categories removed. Transactions keep their rows
/// with category links cleared.
pub fn purge_categories(conn: &Connection) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM subcategories", [])?;
    let removed = tx.execute("DELETE FROM categories", [])?;
    tx.commit()?;
    tracing::info!(removed, "purged categories");
    Ok(removed)
}

pub fn purge_all(conn: &Connection) -> Result<()> {
    purge_transactions(conn)?;
    purge_categories(conn)?;
    Ok(())
}

pub fn reset_categories(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM subcategories", [])?;
    tx.execute("DELETE FROM categories WHERE is_default = 0 OR is_default IS NULL", [])?;
    seed_themes(&tx)?;
    seed_categories(&tx)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::importer::commit;

    const SAMPLE: &[u8] = b"Date;Libell\xe9;Montant;Cat\xe9gorie;Sous-cat\xe9gorie\n\
01/02/2024;Resto;-25,00;Sorties;Restaurant\n\
02/02/2024;Salaire;2000,00;Salaire;\n";

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_purge_transactions() {
        let (_dir, conn) = test_db();
        commit(&conn, SAMPLE, "feb.csv", true).unwrap();
        assert_eq!(purge_transactions(&conn).unwrap(), 2);
        assert_eq!(count(&conn, "transactions"), 0);
        assert_eq!(count(&conn, "import_batches"), 0);
        assert_eq!(count(&conn, "categories"), 16);
    }

    #[test]
    fn test_purge_categories_keeps_transactions() {
        let (_dir, conn) = test_db();
        commit(&conn, SAMPLE, "feb.csv", true).unwrap();
        purge_categories(&conn).unwrap();
        assert_eq!(count(&conn, "categories"), 0);
        assert_eq!(count(&conn, "subcategories"), 0);
        assert_eq!(count(&conn, "themes"), 4);
        let linked: i64 = conn
            .query_row("SELECT count(*) FROM transactions WHERE category_id IS NOT NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count(&conn, "transactions"), 2);
        assert_eq!(linked, 0);
    }

    #[test]
    fn test_purge_all() {
        let (_dir, conn) = test_db();
        commit(&conn, SAMPLE, "feb.csv", true).unwrap();
        purge_all(&conn).unwrap();
        for table in ["transactions", "import_batches", "categories", "subcategories"] {
            assert_eq!(count(&conn, table), 0, "{table} not empty");
        }
    }

    #[test]
    fn test_reset_categories_restores_defaults() {
        let (_dir, conn) = test_db();
        commit(&conn, SAMPLE, "feb.csv", true).unwrap();
        conn.execute("DELETE FROM categories WHERE name = 'Loisirs'", []).unwrap();
        conn.execute("DELETE FROM themes WHERE name = 'Epargne'", []).unwrap();

        reset_categories(&conn).unwrap();

        assert_eq!(count(&conn, "themes"), 4);
        assert_eq!(count(&conn, "categories"), 14);
        assert_eq!(count(&conn, "subcategories"), 0);
        let custom: i64 = conn
            .query_row("SELECT count(*) FROM categories WHERE name IN ('Sorties', 'Salaire')", [], |r| r.get(0))
            .unwrap();
        assert_eq!(custom, 0);
    }
}
