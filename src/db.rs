use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS themes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    is_default INTEGER DEFAULT 0,
    display_order INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    theme_id INTEGER NOT NULL,
    is_default INTEGER DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (theme_id) REFERENCES themes(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS subcategories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS import_batches (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    record_count INTEGER DEFAULT 0,
    checksum TEXT,
    imported_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    label TEXT,
    note TEXT,
    amount REAL NOT NULL,
    category_id INTEGER,
    subcategory_id INTEGER,
    balance REAL,
    import_batch_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
    FOREIGN KEY (subcategory_id) REFERENCES subcategories(id) ON DELETE SET NULL,
    FOREIGN KEY (import_batch_id) REFERENCES import_batches(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
";

// (name, display_order)
pub const DEFAULT_THEMES: &[(&str, i64)] = &[
    ("Dépenses fixes", 1),
    ("Dépenses variables", 2),
    ("Revenus", 3),
    ("Epargne", 4),
];

// (name, theme)
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Impôts / taxes", "Dépenses fixes"),
    ("Logement / maison", "Dépenses fixes"),
    ("Loisirs", "Dépenses variables"),
    ("Véhicule", "Dépenses variables"),
    ("Alimentation", "Dépenses variables"),
    ("Autres dépenses", "Dépenses variables"),
    ("Vie quotidienne", "Dépenses variables"),
    ("Enfants & Scolarité", "Dépenses variables"),
    ("Numérique", "Dépenses variables"),
    ("Famille", "Dépenses variables"),
    ("Vacances / weekend", "Dépenses variables"),
    ("Autres revenus", "Revenus"),
    ("Revenus professionnels", "Revenus"),
    ("Epargne", "Epargne"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM themes", [], |row| row.get(0))?;
    if count == 0 {
        seed_themes(conn)?;
        seed_categories(conn)?;
        tracing::info!("seeded default themes and categories");
    }
    Ok(())
}

/// Insert any default theme that is missing, matched by name.
pub fn seed_themes(conn: &Connection) -> Result<()> {
    for (name, order) in DEFAULT_THEMES {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM themes WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        if !exists {
            conn.execute(
                "INSERT INTO themes (name, is_default, display_order) VALUES (?1, 1, ?2)",
                rusqlite::params![name, order],
            )?;
        }
    }
    Ok(())
}

/// Insert any default category that is missing, matched by name.
pub fn seed_categories(conn: &Connection) -> Result<()> {
    for (name, theme) in DEFAULT_CATEGORIES {
        let theme_id: i64 = conn.query_row(
            "SELECT id FROM themes WHERE name = ?1 ORDER BY id LIMIT 1",
            [theme],
            |row| row.get(0),
        )?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
            [name],
            |row| row.get(0),
        )?;
        if !exists {
            conn.execute(
                "INSERT INTO categories (name, theme_id, is_default) VALUES (?1, ?2, 1)",
                rusqlite::params![name, theme_id],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let conn = get_connection(&dir.path().join("test.db")).unwrap();
    init_db(&conn).unwrap();
    (dir, conn)
}
