use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use serde::Serialize;

use crate::cli::open_db;
use crate::error::{ComptesError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SubcategoryNode {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    pub id: i64,
    pub name: String,
    pub subcategories: Vec<SubcategoryNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThemeNode {
    pub id: i64,
    pub name: String,
    pub display_order: i64,
    pub categories: Vec<CategoryNode>,
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let themes = list_themes(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Theme", "ID", "Category", "Subcategories"]);
    for theme in &themes {
        if theme.categories.is_empty() {
            table.add_row(vec![
                Cell::new(format!("{} (#{})", theme.name, theme.id)),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
        }
        for cat in &theme.categories {
            let subs: Vec<String> = cat
                .subcategories
                .iter()
                .map(|s| format!("{} (#{})", s.name, s.id))
                .collect();
            table.add_row(vec![
                Cell::new(format!("{} (#{})", theme.name, theme.id)),
                Cell::new(cat.id),
                Cell::new(&cat.name),
                Cell::new(subs.join(", ")),
            ]);
        }
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn add(name: &str, theme_id: i64, subcategories: &[String]) -> Result<()> {
    let conn = open_db()?;
    let id = add_category(&conn, name, theme_id, subcategories)?;
    println!("{} {name} (#{id})", "Added category:".green());
    Ok(())
}

pub fn add_sub(name: &str, category_id: i64) -> Result<()> {
    let conn = open_db()?;
    let id = add_subcategory(&conn, name, category_id)?;
    println!("{} {name} (#{id})", "Added subcategory:".green());
    Ok(())
}

pub fn delete_sub(id: i64) -> Result<()> {
    let conn = open_db()?;
    delete_subcategory(&conn, id)?;
    println!("{} {id}", "Deleted subcategory".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

/// Themes in display order, each with its categories and their subcategories.
pub fn list_themes(conn: &Connection) -> Result<Vec<ThemeNode>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name, t.display_order, c.id, c.name, s.id, s.name \
         FROM themes t \
         LEFT JOIN categories c ON c.theme_id = t.id \
         LEFT JOIN subcategories s ON s.category_id = c.id \
         ORDER BY t.display_order, t.id, c.id, s.id",
    )?;
    #[allow(clippy::type_complexity)]
    let rows: Vec<(i64, String, i64, Option<i64>, Option<String>, Option<i64>, Option<String>)> = stmt
        .query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut themes: Vec<ThemeNode> = Vec::new();
    for (theme_id, theme_name, order, cat_id, cat_name, sub_id, sub_name) in rows {
        if themes.last().map(|t| t.id) != Some(theme_id) {
            themes.push(ThemeNode {
                id: theme_id,
                name: theme_name,
                display_order: order,
                categories: Vec::new(),
            });
        }
        let Some(theme) = themes.last_mut() else { continue };
        let (Some(cat_id), Some(cat_name)) = (cat_id, cat_name) else { continue };
        if theme.categories.last().map(|c| c.id) != Some(cat_id) {
            theme.categories.push(CategoryNode {
                id: cat_id,
                name: cat_name,
                subcategories: Vec::new(),
            });
        }
        if let (Some(category), Some(id), Some(name)) = (theme.categories.last_mut(), sub_id, sub_name) {
            category.subcategories.push(SubcategoryNode { id, name });
        }
    }
    Ok(themes)
}

pub fn add_category(conn: &Connection, name: &str, theme_id: i64, subcategories: &[String]) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComptesError::Validation("Name and theme are required".into()));
    }
    let theme_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM themes WHERE id = ?1)",
        [theme_id],
        |row| row.get(0),
    )?;
    if !theme_exists {
        return Err(ComptesError::NotFound(format!("theme {theme_id}")));
    }

    conn.execute(
        "INSERT INTO categories (name, theme_id) VALUES (?1, ?2)",
        rusqlite::params![name, theme_id],
    )?;
    let category_id = conn.last_insert_rowid();

    for sub in subcategories.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        conn.execute(
            "INSERT INTO subcategories (name, category_id) VALUES (?1, ?2)",
            rusqlite::params![sub, category_id],
        )?;
    }
    Ok(category_id)
}

pub fn add_subcategory(conn: &Connection, name: &str, category_id: i64) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ComptesError::Validation("Name and category are required".into()));
    }
    let category_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        [category_id],
        |row| row.get(0),
    )?;
    if !category_exists {
        return Err(ComptesError::NotFound(format!("category {category_id}")));
    }
    conn.execute(
        "INSERT INTO subcategories (name, category_id) VALUES (?1, ?2)",
        rusqlite::params![name, category_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_subcategory(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM subcategories WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(ComptesError::NotFound(format!("subcategory {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;

    fn theme_id(conn: &Connection, name: &str) -> i64 {
        conn.query_row("SELECT id FROM themes WHERE name = ?1", [name], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_list_themes_returns_seeded_tree() {
        let (_dir, conn) = test_db();
        let themes = list_themes(&conn).unwrap();
        let names: Vec<&str> = themes.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Dépenses fixes", "Dépenses variables", "Revenus", "Epargne"]);
        assert_eq!(themes[0].categories.len(), 2);
        assert_eq!(themes[1].categories.len(), 9);
        assert_eq!(themes[2].categories.len(), 2);
        assert_eq!(themes[3].categories.len(), 1);
    }

    #[test]
    fn test_add_category_with_subcategories() {
        let (_dir, conn) = test_db();
        let savings = theme_id(&conn, "Epargne");
        let subs = vec!["PEA".to_string(), "  ".to_string(), " Livret A ".to_string()];
        let id = add_category(&conn, "Placements", savings, &subs).unwrap();

        let themes = list_themes(&conn).unwrap();
        let cat = themes
            .iter()
            .flat_map(|t| &t.categories)
            .find(|c| c.id == id)
            .unwrap();
        let sub_names: Vec<&str> = cat.subcategories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(sub_names, vec!["PEA", "Livret A"]);
    }

    #[test]
    fn test_add_category_requires_name_and_theme() {
        let (_dir, conn) = test_db();
        let err = add_category(&conn, "  ", 1, &[]).unwrap_err();
        assert!(matches!(err, ComptesError::Validation(_)));
        let err = add_category(&conn, "Orphan", 999, &[]).unwrap_err();
        assert!(matches!(err, ComptesError::NotFound(_)));
    }

    #[test]
    fn test_add_and_delete_subcategory() {
        let (_dir, conn) = test_db();
        let food: i64 = conn
            .query_row("SELECT id FROM categories WHERE name = 'Alimentation'", [], |r| r.get(0))
            .unwrap();
        let id = add_subcategory(&conn, "Marché", food).unwrap();
        assert!(matches!(add_subcategory(&conn, "x", 999).unwrap_err(), ComptesError::NotFound(_)));

        delete_subcategory(&conn, id).unwrap();
        assert!(matches!(delete_subcategory(&conn, id).unwrap_err(), ComptesError::NotFound(_)));
    }

    #[test]
    fn test_deleting_subcategory_unlinks_transactions() {
        let (_dir, conn) = test_db();
        let food: i64 = conn
            .query_row("SELECT id FROM categories WHERE name = 'Alimentation'", [], |r| r.get(0))
            .unwrap();
        let sub = add_subcategory(&conn, "Marché", food).unwrap();
        conn.execute(
            "INSERT INTO transactions (date, label, amount, category_id, subcategory_id) \
             VALUES ('2024-01-01', 'Primeur', -9.5, ?1, ?2)",
            [food, sub],
        )
        .unwrap();
        delete_subcategory(&conn, sub).unwrap();
        let linked: Option<i64> = conn
            .query_row("SELECT subcategory_id FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert!(linked.is_none());
    }
}
