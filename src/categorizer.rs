use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use rusqlite::Connection;

use crate::error::Result;
use crate::models::ThemeKind;

/// Ordered keyword rules; the first rule with a keyword contained in the
/// normalized category name decides the theme.
const THEME_RULES: &[(&[&str], ThemeKind)] = &[
    (&["epargne", "assurance", "livret", "placement"], ThemeKind::Savings),
    (&["salaire", "revenu", "paie"], ThemeKind::Income),
    (&["impot", "taxe", "logement", "loyer", "credit", "emprunt"], ThemeKind::FixedExpenses),
];

const DEFAULT_THEME: ThemeKind = ThemeKind::VariableExpenses;

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]").expect("literal regex"))
}

fn fold_diacritic(c: char) -> &'static str {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        _ => "",
    }
}

/// Lower-case, strip diacritics, then drop everything that is not `[a-z0-9]`.
pub fn normalize_name(name: &str) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        match fold_diacritic(c) {
            "" => folded.push(c),
            ascii => folded.push_str(ascii),
        }
    }
    non_alphanumeric().replace_all(&folded, "").into_owned()
}

pub fn infer_theme(category_name: &str) -> ThemeKind {
    let normalized = normalize_name(category_name);
    THEME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| normalized.contains(k)))
        .map(|(_, theme)| *theme)
        .unwrap_or(DEFAULT_THEME)
}

fn lookup_keys(name: &str) -> Vec<String> {
    let lowered = name.trim().to_lowercase();
    let normalized = normalize_name(name);
    let mut keys = vec![lowered];
    if !normalized.is_empty() && normalized != keys[0] {
        keys.push(normalized);
    }
    keys
}

// Cache entries added since the last keep/discard.
enum Created {
    Category(Vec<String>),
    Subcategory(Vec<(i64, String)>),
    Theme(ThemeKind),
}

/// Per-import lookup of categories and subcategories, built from one bulk read
/// and extended with every row created while the batch runs.
///
/// Rows created by `resolve_*` stay pending until `keep_pending` or
/// `discard_pending`; discarding forgets them, matching a rolled-back savepoint.
pub struct CategoryCache {
    categories: HashMap<String, i64>,
    subcategories: HashMap<(i64, String), i64>,
    themes: HashMap<ThemeKind, i64>,
    pending: Vec<Created>,
    pub new_categories: usize,
    pub new_subcategories: usize,
}

impl CategoryCache {
    pub fn load(conn: &Connection) -> Result<Self> {
        let mut cache = Self {
            categories: HashMap::new(),
            subcategories: HashMap::new(),
            themes: HashMap::new(),
            pending: Vec::new(),
            new_categories: 0,
            new_subcategories: 0,
        };

        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (id, name) in rows {
            cache.remember_category(&name, id);
        }

        let mut stmt = conn.prepare("SELECT id, category_id, name FROM subcategories ORDER BY id")?;
        let rows: Vec<(i64, i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (id, category_id, name) in rows {
            cache.remember_subcategory(category_id, &name, id);
        }

        let mut stmt = conn.prepare("SELECT id, name FROM themes ORDER BY id")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for kind in [
            ThemeKind::FixedExpenses,
            ThemeKind::VariableExpenses,
            ThemeKind::Income,
            ThemeKind::Savings,
        ] {
            if let Some((id, _)) = rows.iter().find(|(_, name)| name == kind.name()) {
                cache.themes.insert(kind, *id);
            }
        }

        tracing::debug!(
            categories = cache.categories.len(),
            subcategories = cache.subcategories.len(),
            "category cache loaded"
        );
        Ok(cache)
    }

    /// Returns the keys that were not already taken.
    fn remember_category(&mut self, name: &str, id: i64) -> Vec<String> {
        let mut added = Vec::new();
        for key in lookup_keys(name) {
            if !self.categories.contains_key(&key) {
                self.categories.insert(key.clone(), id);
                added.push(key);
            }
        }
        added
    }

    fn remember_subcategory(&mut self, category_id: i64, name: &str, id: i64) -> Vec<(i64, String)> {
        let mut added = Vec::new();
        for key in lookup_keys(name) {
            let key = (category_id, key);
            if !self.subcategories.contains_key(&key) {
                self.subcategories.insert(key.clone(), id);
                added.push(key);
            }
        }
        added
    }

    pub fn keep_pending(&mut self) {
        self.pending.clear();
    }

    pub fn discard_pending(&mut self) {
        for created in self.pending.drain(..) {
            match created {
                Created::Category(keys) => {
                    for key in keys {
                        self.categories.remove(&key);
                    }
                    self.new_categories -= 1;
                }
                Created::Subcategory(keys) => {
                    for key in keys {
                        self.subcategories.remove(&key);
                    }
                    self.new_subcategories -= 1;
                }
                Created::Theme(kind) => {
                    self.themes.remove(&kind);
                }
            }
        }
    }

    pub fn find_category(&self, name: &str) -> Option<i64> {
        lookup_keys(name)
            .into_iter()
            .find_map(|key| self.categories.get(&key).copied())
    }

    pub fn find_subcategory(&self, category_id: i64, name: &str) -> Option<i64> {
        lookup_keys(name)
            .into_iter()
            .find_map(|key| self.subcategories.get(&(category_id, key)).copied())
    }

    fn theme_id(&mut self, conn: &Connection, kind: ThemeKind) -> Result<i64> {
        if let Some(id) = self.themes.get(&kind) {
            return Ok(*id);
        }
        // Themes were purged; recreate the one we need.
        conn.execute(
            "INSERT INTO themes (name, is_default, display_order) VALUES (?1, 1, ?2)",
            rusqlite::params![kind.name(), kind.display_order()],
        )?;
        let id = conn.last_insert_rowid();
        self.themes.insert(kind, id);
        self.pending.push(Created::Theme(kind));
        Ok(id)
    }

    /// Return the id of the category matching `name`, creating it under the
    /// inferred theme when nothing matches.
    pub fn resolve_category(&mut self, conn: &Connection, name: &str) -> Result<i64> {
        if let Some(id) = self.find_category(name) {
            return Ok(id);
        }
        let name = name.trim();
        let theme = infer_theme(name);
        let theme_id = self.theme_id(conn, theme)?;
        conn.execute(
            "INSERT INTO categories (name, theme_id) VALUES (?1, ?2)",
            rusqlite::params![name, theme_id],
        )?;
        let id = conn.last_insert_rowid();
        let keys = self.remember_category(name, id);
        self.pending.push(Created::Category(keys));
        self.new_categories += 1;
        tracing::debug!(category = name, theme = theme.name(), id, "created category");
        Ok(id)
    }

    pub fn resolve_subcategory(&mut self, conn: &Connection, category_id: i64, name: &str) -> Result<i64> {
        if let Some(id) = self.find_subcategory(category_id, name) {
            return Ok(id);
        }
        let name = name.trim();
        conn.execute(
            "INSERT INTO subcategories (name, category_id) VALUES (?1, ?2)",
            rusqlite::params![name, category_id],
        )?;
        let id = conn.last_insert_rowid();
        let keys = self.remember_subcategory(category_id, name, id);
        self.pending.push(Created::Subcategory(keys));
        self.new_subcategories += 1;
        tracing::debug!(subcategory = name, category_id, id, "created subcategory");
        Ok(id)
    }
}
