//! In-memory tabular data.
//!
//! Columns carry their kind as a tagged union decided once at construction,
//! so downstream components pattern-match on the tag instead of probing values.

use serde::{Deserialize, Serialize, Serializer};

use crate::{PrivacyError, Result};

/// Declared kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// Column values, one per row. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grouping key of the cell at `row`. Out-of-range rows read as missing.
    #[must_use]
    pub fn key_at(&self, row: usize) -> CellKey {
        match self {
            Self::Numeric(v) => match v.get(row).copied().flatten() {
                Some(x) => CellKey::number(x),
                None => CellKey::Missing,
            },
            Self::Categorical(v) => match v.get(row).and_then(Option::as_deref) {
                Some(s) => CellKey::Text(s.to_string()),
                None => CellKey::Missing,
            },
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawColumn")]
pub struct Column {
    name: String,
    data: ColumnData,
}

/// Wire form of a [`Column`]; normalized through [`Column::new`].
#[derive(Deserialize)]
struct RawColumn {
    name: String,
    data: ColumnData,
}

impl From<RawColumn> for Column {
    fn from(raw: RawColumn) -> Self {
        Self::new(raw.name, raw.data)
    }
}

impl Column {
    /// Create a column from already-tagged data.
    ///
    /// Non-finite numbers are stored as missing.
    #[must_use]
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        let data = match data {
            ColumnData::Numeric(values) => ColumnData::Numeric(
                values
                    .into_iter()
                    .map(|v| v.filter(|x| x.is_finite()))
                    .collect(),
            ),
            other => other,
        };
        Self {
            name: name.into(),
            data,
        }
    }

    /// Numeric column without missing values.
    #[must_use]
    pub fn numeric(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(
            name,
            ColumnData::Numeric(values.into_iter().map(Some).collect()),
        )
    }

    /// Numeric column where `None` marks a missing cell.
    #[must_use]
    pub fn numeric_with_missing(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        Self::new(name, ColumnData::Numeric(values.into_iter().collect()))
    }

    /// Categorical column without missing values.
    #[must_use]
    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(
            name,
            ColumnData::Categorical(values.into_iter().map(|s| Some(s.into())).collect()),
        )
    }

    /// Categorical column where `None` marks a missing cell.
    #[must_use]
    pub fn categorical_with_missing(
        name: impl Into<String>,
        values: impl IntoIterator<Item = Option<String>>,
    ) -> Self {
        Self::new(name, ColumnData::Categorical(values.into_iter().collect()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Numeric values, or `None` for a categorical column.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Numeric values, failing with `InvalidColumn` for a categorical column.
    pub fn require_numeric(&self) -> Result<&[Option<f64>]> {
        self.as_numeric().ok_or_else(|| {
            PrivacyError::InvalidColumn(format!(
                "column '{}' is {}, expected numeric",
                self.name,
                self.kind()
            ))
        })
    }
}

/// Ordered collection of equally long columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<Column>,
    #[serde(skip_serializing)]
    num_rows: usize,
}

/// Wire form of a [`Table`]; validated through [`Table::new`].
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = PrivacyError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Self::new(raw.columns)
    }
}

impl Table {
    /// Build a table.
    ///
    /// # Errors
    /// Returns `InvalidColumn` if column lengths differ or a name repeats.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, Column::len);

        for (i, column) in columns.iter().enumerate() {
            if column.len() != num_rows {
                return Err(PrivacyError::InvalidColumn(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    num_rows
                )));
            }
            if columns[..i].iter().any(|c| c.name() == column.name()) {
                return Err(PrivacyError::InvalidColumn(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self { columns, num_rows })
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Look up a column by name.
    ///
    /// # Errors
    /// Returns `InvalidColumn` if no column has that name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| PrivacyError::InvalidColumn(format!("column '{name}' not found")))
    }

    /// Columns of numeric kind, in table order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
    }
}

/// Hashable value of one cell, used to group rows.
///
/// Numbers are compared by bit pattern after folding `-0.0` into `0.0`;
/// missing cells form a category of their own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKey {
    Missing,
    Number(u64),
    Text(String),
}

impl CellKey {
    #[must_use]
    pub fn number(value: f64) -> Self {
        let folded = if value == 0.0 { 0.0 } else { value };
        Self::Number(folded.to_bits())
    }
}

impl std::fmt::Display for CellKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "<missing>"),
            Self::Number(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for CellKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Missing => serializer.serialize_none(),
            Self::Number(bits) => serializer.serialize_f64(f64::from_bits(*bits)),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}
