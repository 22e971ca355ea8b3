use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use csv::StringRecord;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::categorizer::{normalize_name, CategoryCache};
use crate::error::{ComptesError, Result};
use crate::models::{ImportBatch, ParsedRow};

pub const PLACEHOLDER_LABEL: &str = "Transaction sans libellé";
const MIN_TOKENS: usize = 4;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Decode ISO-8859-1 bytes and normalize line endings to `\n`.
pub fn decode(bytes: &[u8]) -> String {
    let text = encoding_rs::mem::decode_latin1(bytes);
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// French-locale number: spaces as thousands separator, comma as decimal point.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}'))
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `DD/MM/YYYY` to ISO `YYYY-MM-DD`.
pub fn parse_date_dmy(raw: &str) -> Option<String> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let d: u32 = parts[0].trim().parse().ok()?;
    let m: u32 = parts[1].trim().parse().ok()?;
    let y: i32 = parts[2].trim().parse().ok()?;
    chrono::NaiveDate::from_ymd_opt(y, m, d).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// Blanks between a delimiter and an opening quote.
fn padded_quote() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(^|;)[ \t]+""#).expect("literal regex"))
}

fn tokenize(line: &str) -> StringRecord {
    // The csv reader only honours a quote that opens the field.
    let line = padded_quote().replace_all(line, "${1}\"");
    let mut record = StringRecord::new();
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    if !matches!(rdr.read_record(&mut record), Ok(true)) {
        record.clear();
    }
    record
}

fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Header resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Date,
    Label,
    Note,
    Amount,
    Category,
    Subcategory,
    Balance,
}

// Matched against the accent-folded header, in order: "sous-catégorie" also
// contains "categor".
const HEADER_FRAGMENTS: &[(&str, Column)] = &[
    ("sous", Column::Subcategory),
    ("categor", Column::Category),
    ("libell", Column::Label),
    ("note", Column::Note),
    ("montant", Column::Amount),
    ("solde", Column::Balance),
    ("date", Column::Date),
];

#[derive(Debug, Default, Clone, PartialEq)]
struct ColumnMap {
    date: Option<usize>,
    label: Option<usize>,
    note: Option<usize>,
    amount: Option<usize>,
    category: Option<usize>,
    subcategory: Option<usize>,
    balance: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &StringRecord) -> Self {
        let mut map = Self::default();
        for (idx, field) in header.iter().enumerate() {
            let field = normalize_name(field);
            let Some((_, column)) = HEADER_FRAGMENTS.iter().find(|(frag, _)| field.contains(frag)) else {
                continue;
            };
            let slot = map.slot(*column);
            // First matching column wins.
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
        map
    }

    fn slot(&mut self, column: Column) -> &mut Option<usize> {
        match column {
            Column::Date => &mut self.date,
            Column::Label => &mut self.label,
            Column::Note => &mut self.note,
            Column::Amount => &mut self.amount,
            Column::Category => &mut self.category,
            Column::Subcategory => &mut self.subcategory,
            Column::Balance => &mut self.balance,
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, idx: Option<usize>) -> &'r str {
        idx.and_then(|i| record.get(i)).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Row parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    TooShort,
    BadDate,
    BadAmount,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "fewer than {MIN_TOKENS} fields"),
            Self::BadDate => write!(f, "date is not DD/MM/YYYY"),
            Self::BadAmount => write!(f, "amount is not a number"),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_row(
    record: &StringRecord,
    columns: &ColumnMap,
    row_index: usize,
) -> std::result::Result<ParsedRow, RowRejection> {
    if record.len() < MIN_TOKENS {
        return Err(RowRejection::TooShort);
    }
    let date = parse_date_dmy(columns.get(record, columns.date)).ok_or(RowRejection::BadDate)?;
    let amount = parse_amount(columns.get(record, columns.amount)).ok_or(RowRejection::BadAmount)?;
    let category = non_empty(columns.get(record, columns.category));
    let subcategory = non_empty(columns.get(record, columns.subcategory));

    let label = match columns.get(record, columns.label) {
        "" => category.clone().unwrap_or_else(|| PLACEHOLDER_LABEL.to_string()),
        label => label.to_string(),
    };

    Ok(ParsedRow {
        row_index,
        date,
        label,
        note: non_empty(columns.get(record, columns.note)),
        amount,
        category,
        subcategory,
        balance: parse_amount(columns.get(record, columns.balance)),
    })
}

/// Composite identity of a transaction: date, trimmed label, amount in cents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    date: String,
    label: String,
    cents: i64,
}

impl DuplicateKey {
    pub fn of(row: &ParsedRow) -> Self {
        Self {
            date: row.date.clone(),
            label: row.label.trim().to_string(),
            cents: (row.amount * 100.0).round() as i64,
        }
    }
}

/// Parsed file with rows split into first occurrences and in-file duplicates,
/// both in file order.
#[derive(Debug, Default)]
struct Scan {
    unique: Vec<ParsedRow>,
    duplicates: Vec<ParsedRow>,
    all: Vec<ParsedRow>,
    invalid_rows: usize,
}

fn scan(bytes: &[u8]) -> Result<Scan> {
    let text = decode(bytes);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(ComptesError::Validation("invalid or empty CSV".into()));
    }

    let columns = ColumnMap::from_header(&tokenize(lines[0]));
    tracing::debug!(?columns, "resolved header columns");

    let mut scan = Scan::default();
    let mut seen = HashSet::new();
    for (i, line) in lines.iter().enumerate().skip(1) {
        let row_index = i + 1;
        let row = match parse_row(&tokenize(line), &columns, row_index) {
            Ok(row) => row,
            Err(reason) => {
                tracing::debug!(row_index, %reason, "dropped row");
                scan.invalid_rows += 1;
                continue;
            }
        };
        if seen.insert(DuplicateKey::of(&row)) {
            scan.unique.push(row.clone());
        } else {
            scan.duplicates.push(row.clone());
        }
        scan.all.push(row);
    }
    Ok(scan)
}

// ---------------------------------------------------------------------------
// Dry run
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRow {
    pub date: String,
    pub label: String,
    pub amount: f64,
    pub row_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportAnalysis {
    pub total_rows: usize,
    pub unique_rows: usize,
    pub duplicates_in_file: Vec<DuplicateRow>,
    pub duplicates_count: usize,
    pub invalid_rows: usize,
}

/// Parse and report in-file duplicates without touching storage.
pub fn analyze(bytes: &[u8]) -> Result<ImportAnalysis> {
    let scan = scan(bytes)?;
    let duplicates_in_file: Vec<DuplicateRow> = scan
        .duplicates
        .iter()
        .map(|row| DuplicateRow {
            date: row.date.clone(),
            label: row.label.clone(),
            amount: row.amount,
            row_index: row.row_index,
        })
        .collect();
    Ok(ImportAnalysis {
        total_rows: scan.all.len(),
        unique_rows: scan.unique.len(),
        duplicates_count: duplicates_in_file.len(),
        duplicates_in_file,
        invalid_rows: scan.invalid_rows,
    })
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    pub imported: usize,
    pub skipped: usize,
    pub new_categories: usize,
    pub new_subcategories: usize,
    pub batch_id: i64,
    pub invalid_rows: usize,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_batch_id: Option<i64>,
}

/// Same date and amount, label equal after trimming and Unicode lowercasing.
fn exists_in_store(conn: &Connection, row: &ParsedRow) -> Result<bool> {
    let mut stmt = conn.prepare_cached(
        "SELECT label FROM transactions WHERE date = ?1 AND abs(amount - ?2) < 0.005",
    )?;
    let wanted = row.label.trim().to_lowercase();
    let mut labels = stmt.query(rusqlite::params![row.date, round_cents(row.amount)])?;
    while let Some(stored) = labels.next()? {
        let label: Option<String> = stored.get(0)?;
        if label.is_some_and(|l| l.trim().to_lowercase() == wanted) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn insert_row(
    conn: &Connection,
    cache: &mut CategoryCache,
    row: &ParsedRow,
    batch_id: i64,
) -> Result<()> {
    let category_id = match &row.category {
        Some(name) => Some(cache.resolve_category(conn, name)?),
        None => None,
    };
    let subcategory_id = match (category_id, &row.subcategory) {
        (Some(cat), Some(name)) => Some(cache.resolve_subcategory(conn, cat, name)?),
        _ => None,
    };
    conn.prepare_cached(
        "INSERT INTO transactions \
         (date, label, note, amount, category_id, subcategory_id, balance, import_batch_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?
    .execute(rusqlite::params![
        row.date,
        row.label,
        row.note,
        round_cents(row.amount),
        category_id,
        subcategory_id,
        row.balance.map(round_cents),
        batch_id,
    ])?;
    Ok(())
}

/// Persist a file. With `skip_duplicates`, in-file duplicates and rows
/// already stored are left out; otherwise every parsed row is inserted.
pub fn commit(
    conn: &Connection,
    bytes: &[u8],
    filename: &str,
    skip_duplicates: bool,
) -> Result<CommitResult> {
    let scan = scan(bytes)?;
    let rows = if skip_duplicates { &scan.unique } else { &scan.all };
    let checksum = compute_checksum(bytes);

    let mut tx = conn.unchecked_transaction()?;

    let previous_batch_id: Option<i64> = tx
        .query_row(
            "SELECT id FROM import_batches WHERE checksum = ?1 ORDER BY id DESC LIMIT 1",
            [&checksum],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(prev) = previous_batch_id {
        tracing::warn!(filename, previous_batch = prev, "file content was already imported");
    }

    tx.execute(
        "INSERT INTO import_batches (filename, record_count, checksum) VALUES (?1, 0, ?2)",
        rusqlite::params![filename, checksum],
    )?;
    let batch_id = tx.last_insert_rowid();
    tracing::info!(batch_id, filename, rows = rows.len(), skip_duplicates, "import started");

    let mut cache = CategoryCache::load(&tx)?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    let mut errors = Vec::new();

    for row in rows {
        // A failed row takes the categories created for it down with it.
        let sp = tx.savepoint()?;
        let outcome = if skip_duplicates {
            exists_in_store(&sp, row)
        } else {
            Ok(false)
        };
        match outcome.and_then(|exists| {
            if exists {
                Ok(false)
            } else {
                insert_row(&sp, &mut cache, row, batch_id).map(|_| true)
            }
        }) {
            Ok(inserted) => {
                sp.commit()?;
                cache.keep_pending();
                if inserted {
                    imported += 1;
                } else {
                    skipped += 1;
                }
            }
            Err(e) => {
                drop(sp);
                cache.discard_pending();
                tracing::warn!(row_index = row.row_index, error = %e, "row not imported");
                errors.push(format!("row {}: {e}", row.row_index));
            }
        }
    }

    tx.execute(
        "UPDATE import_batches SET record_count = ?1 WHERE id = ?2",
        rusqlite::params![imported as i64, batch_id],
    )?;
    tx.commit()?;

    tracing::info!(batch_id, imported, skipped, failed = errors.len(), "import finished");

    Ok(CommitResult {
        imported,
        skipped,
        new_categories: cache.new_categories,
        new_subcategories: cache.new_subcategories,
        batch_id,
        invalid_rows: scan.invalid_rows,
        errors,
        previous_batch_id,
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    DryRun,
    Commit { skip_duplicates: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ImportOutcome {
    DryRun(ImportAnalysis),
    Committed(CommitResult),
}

pub fn import_transactions(
    conn: &Connection,
    bytes: &[u8],
    filename: &str,
    mode: ImportMode,
) -> Result<ImportOutcome> {
    match mode {
        ImportMode::DryRun => analyze(bytes).map(ImportOutcome::DryRun),
        ImportMode::Commit { skip_duplicates } => {
            commit(conn, bytes, filename, skip_duplicates).map(ImportOutcome::Committed)
        }
    }
}

pub fn recent_batches(conn: &Connection, limit: usize) -> Result<Vec<ImportBatch>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, record_count, checksum, imported_at \
         FROM import_batches ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok(ImportBatch {
                id: row.get(0)?,
                filename: row.get(1)?,
                record_count: row.get(2)?,
                checksum: row.get(3)?,
                imported_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
