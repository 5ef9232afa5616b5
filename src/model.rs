use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell in a measurement column
// ---------------------------------------------------------------------------

/// A dynamically-typed table value mirroring the scalar types found in
/// per-cell measurement exports.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric comparison.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow the value as text, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Int(i)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// CellRow / CellTable – the abstract measurement table
// ---------------------------------------------------------------------------

/// One table row: column name → value. A column absent from the map is
/// treated the same as an explicit [`CellValue::Null`].
pub type CellRow = BTreeMap<String, CellValue>;

/// An ordered sequence of rows with a pre-computed column index.
///
/// How the rows were obtained (file parsing, segmentation output, …) is the
/// caller's concern; the selection engine only ever reads this structure.
#[derive(Debug, Clone)]
pub struct CellTable {
    /// All rows, in their original order.
    pub rows: Vec<CellRow>,
    /// Ordered list of every column name appearing in any row.
    pub column_names: Vec<String>,
}

impl CellTable {
    /// Build the column index from the given rows.
    pub fn from_rows(rows: Vec<CellRow>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        for row in &rows {
            for col in row.keys() {
                column_names_set.insert(col.clone());
            }
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        CellTable { rows, column_names }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row carries the given column.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_names.iter().any(|c| c == name)
    }

    /// Value of `column` in row `row`, with absent treated as `Null`.
    pub fn value(&self, row: usize, column: &str) -> &CellValue {
        self.rows[row].get(column).unwrap_or(&CellValue::Null)
    }
}
