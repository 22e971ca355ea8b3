use serde::Serialize;

/// Top-level grouping every category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ThemeKind {
    FixedExpenses,
    VariableExpenses,
    Income,
    Savings,
}

impl ThemeKind {
    /// Name of the seeded theme row.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FixedExpenses => "Dépenses fixes",
            Self::VariableExpenses => "Dépenses variables",
            Self::Income => "Revenus",
            Self::Savings => "Epargne",
        }
    }

    pub fn display_order(&self) -> i64 {
        match self {
            Self::FixedExpenses => 1,
            Self::VariableExpenses => 2,
            Self::Income => 3,
            Self::Savings => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportBatch {
    pub id: i64,
    pub filename: String,
    pub record_count: i64,
    pub checksum: Option<String>,
    pub imported_at: String,
}

/// One data line of a bank export, typed right after tokenization.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 1-based position among non-blank lines, header included.
    pub row_index: usize,
    /// ISO `YYYY-MM-DD`.
    pub date: String,
    pub label: String,
    pub note: Option<String>,
    pub amount: f64,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub balance: Option<f64>,
}
