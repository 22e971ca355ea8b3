use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;
use serde::Serialize;

use crate::cli::open_db;
use crate::error::{ComptesError, Result};
use crate::fmt::euros;

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub category_id: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub label: String,
    pub note: Option<String>,
    pub amount: f64,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub subcategory_id: Option<i64>,
    pub subcategory_name: Option<String>,
    pub balance: Option<f64>,
    pub import_batch_id: Option<i64>,
}

pub fn list(filter: TransactionFilter, json: bool) -> Result<()> {
    let conn = open_db()?;
    let rows = list_transactions(&conn, &filter)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Label", "Amount", "Category", "Subcategory", "Note"]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.date),
            Cell::new(&row.label),
            Cell::new(euros(row.amount)),
            Cell::new(row.category_name.as_deref().unwrap_or("")),
            Cell::new(row.subcategory_name.as_deref().unwrap_or("")),
            Cell::new(row.note.as_deref().unwrap_or("")),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}

pub fn edit(
    id: i64,
    label: &str,
    note: Option<&str>,
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
) -> Result<()> {
    let conn = open_db()?;
    update_transaction(&conn, id, label, note, category_id, subcategory_id)?;
    println!("{} {id}", "Updated transaction".green());
    Ok(())
}

pub fn delete(ids: &[i64]) -> Result<()> {
    let conn = open_db()?;
    let deleted = if let [id] = ids {
        delete_transaction(&conn, *id)?;
        1
    } else {
        delete_transactions(&conn, ids)?
    };
    println!("{} {deleted} transaction(s)", "Deleted".green());
    Ok(())
}

// ---------------------------------------------------------------------------
// Data layer
// ---------------------------------------------------------------------------

pub fn list_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.label, t.note, t.amount, \
                t.category_id, c.name, t.subcategory_id, s.name, \
                t.balance, t.import_batch_id \
         FROM transactions t \
         LEFT JOIN categories c ON t.category_id = c.id \
         LEFT JOIN subcategories s ON t.subcategory_id = s.id \
         WHERE 1=1",
    );
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(year) = filter.year {
        sql.push_str(" AND substr(t.date, 1, 4) = ?");
        params.push(Box::new(format!("{year:04}")));
    }
    if let Some(month) = filter.month {
        sql.push_str(" AND substr(t.date, 6, 2) = ?");
        params.push(Box::new(format!("{month:02}")));
    }
    if let Some(category_id) = filter.category_id {
        sql.push_str(" AND t.category_id = ?");
        params.push(Box::new(category_id));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC LIMIT ? OFFSET ?");
    params.push(Box::new(if filter.limit > 0 { filter.limit } else { 100 }));
    params.push(Box::new(filter.offset.max(0)));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                date: row.get(1)?,
                label: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                note: row.get(3)?,
                amount: row.get(4)?,
                category_id: row.get(5)?,
                category_name: row.get(6)?,
                subcategory_id: row.get(7)?,
                subcategory_name: row.get(8)?,
                balance: row.get(9)?,
                import_batch_id: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_transaction(
    conn: &Connection,
    id: i64,
    label: &str,
    note: Option<&str>,
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
) -> Result<()> {
    let note = note.filter(|n| !n.trim().is_empty());
    let updated = conn.execute(
        "UPDATE transactions SET label = ?1, note = ?2, category_id = ?3, subcategory_id = ?4 WHERE id = ?5",
        rusqlite::params![label, note, category_id, subcategory_id, id],
    )?;
    if updated == 0 {
        return Err(ComptesError::NotFound(format!("transaction {id}")));
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(ComptesError::NotFound(format!("transaction {id}")));
    }
    Ok(())
}

/// Bulk delete; ids that do not exist are ignored. Returns the number removed.
pub fn delete_transactions(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Err(ComptesError::Validation("ID required".into()));
    }
    let placeholders = vec!["?"; ids.len()].join(",");
    let deleted = conn.execute(
        &format!("DELETE FROM transactions WHERE id IN ({placeholders})"),
        rusqlite::params_from_iter(ids.iter()),
    )?;
    Ok(deleted)
}
