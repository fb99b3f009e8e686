//! In-memory measurement table: ordered channels of typed columns.

use chrono::NaiveDateTime;
use indexmap::IndexMap;

/// A single channel's data.
///
/// Numeric channels use NaN for missing or rejected values so that quality
/// filtering never changes row counts. Non-numeric instrument fields (raw
/// `Date`/`Time` text) stay as text.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numeric samples; NaN marks missing/invalid.
    Float(Vec<f64>),
    /// Free-text values.
    Text(Vec<String>),
    /// Per-row boolean attributes (cast labels).
    Bool(Vec<bool>),
    /// Synthesized timestamps.
    DateTime(Vec<NaiveDateTime>),
}

impl Column {
    /// Number of rows in this column.
    pub fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Text(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::DateTime(v) => v.len(),
        }
    }

    /// Whether the column holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is a numeric channel.
    pub fn is_float(&self) -> bool {
        matches!(self, Column::Float(_))
    }

    fn filtered(&self, keep: &[bool]) -> Column {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|&(_, &k)| k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            Column::Float(v) => Column::Float(pick(v, keep)),
            Column::Text(v) => Column::Text(pick(v, keep)),
            Column::Bool(v) => Column::Bool(pick(v, keep)),
            Column::DateTime(v) => Column::DateTime(pick(v, keep)),
        }
    }

    fn append(&mut self, other: &Column) -> bool {
        match (self, other) {
            (Column::Float(a), Column::Float(b)) => a.extend_from_slice(b),
            (Column::Text(a), Column::Text(b)) => a.extend_from_slice(b),
            (Column::Bool(a), Column::Bool(b)) => a.extend_from_slice(b),
            (Column::DateTime(a), Column::DateTime(b)) => a.extend_from_slice(b),
            _ => return false,
        }
        true
    }
}

/// Ordered collection of equally sized channels, one row per sensor sample.
///
/// Row order is time order. Stages mutate columns in place but must preserve
/// row count and datetime ordering, except for the explicit cast
/// re-concatenation performed by the segmenter.
#[derive(Debug, Clone, Default)]
pub struct MeasurementTable {
    columns: IndexMap<String, Column>,
}

impl MeasurementTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            columns: IndexMap::new(),
        }
    }

    /// Number of rows (0 for an empty table).
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map_or(0, Column::len)
    }

    /// Number of channels.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All channel names in column order.
    pub fn channel_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Names of numeric channels in column order.
    pub fn float_channel_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|(_, c)| c.is_float())
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Whether a channel exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Whether every listed channel exists.
    pub fn has_channels<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.contains(n.as_ref()))
    }

    /// Get a column by channel name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Get a mutable column by channel name.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.get_mut(name)
    }

    /// Numeric channel values, if the channel exists and is numeric.
    pub fn float(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name) {
            Some(Column::Float(v)) => Some(v),
            _ => None,
        }
    }

    /// Mutable numeric channel values.
    pub fn float_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        match self.columns.get_mut(name) {
            Some(Column::Float(v)) => Some(v),
            _ => None,
        }
    }

    /// Text channel values.
    pub fn text(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name) {
            Some(Column::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Boolean channel values.
    pub fn bools(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name) {
            Some(Column::Bool(v)) => Some(v),
            _ => None,
        }
    }

    /// Datetime channel values.
    pub fn datetimes(&self, name: &str) -> Option<&[NaiveDateTime]> {
        match self.columns.get(name) {
            Some(Column::DateTime(v)) => Some(v),
            _ => None,
        }
    }

    /// Insert or replace a column. The column must match the table's row
    /// count unless the table is empty.
    pub fn insert(&mut self, name: impl Into<String>, column: Column) {
        if !self.columns.is_empty() {
            assert_eq!(
                column.len(),
                self.row_count(),
                "column length must match table row count"
            );
        }
        self.columns.insert(name.into(), column);
    }

    /// Insert or replace a numeric channel.
    pub fn insert_float(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.insert(name, Column::Float(values));
    }

    /// Build a new table keeping only rows where `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> MeasurementTable {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.filtered(keep)))
            .collect();
        MeasurementTable { columns }
    }

    /// Append another table's rows. Both tables must share the same channel
    /// set with matching column types; mismatched channels are dropped.
    pub fn append_rows(&mut self, other: &MeasurementTable) {
        let mut dropped = Vec::new();
        for (name, col) in &mut self.columns {
            match other.columns.get(name) {
                Some(other_col) if col.append(other_col) => {}
                _ => dropped.push(name.clone()),
            }
        }
        for name in dropped {
            self.columns.shift_remove(&name);
        }
    }

    /// Check whether a raw cell represents a missing value.
    pub fn is_null_value(value: &str) -> bool {
        let trimmed = value.trim();
        trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("na")
            || trimmed.eq_ignore_ascii_case("n/a")
            || trimmed.eq_ignore_ascii_case("nan")
            || trimmed.eq_ignore_ascii_case("null")
    }
}
