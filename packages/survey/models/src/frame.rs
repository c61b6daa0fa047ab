//! Generic tabular data passed between pipeline stages.
//!
//! A [`Frame`] is a named-column table of loosely-typed scalar [`Value`]s.
//! It is the currency every stage speaks: the microdata loader produces
//! one, the store writes and queries them, and the analytics layer
//! reshapes them. Wide microdata tables have too many columns to model as
//! structs, so the scalar tag carries the type information instead.

use serde::{Deserialize, Serialize};

/// A loosely-typed scalar cell value.
///
/// `Null` represents a missing observation (empty cell or a statistical
/// missing marker in the source file).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Missing value.
    Null,
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Real(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers coerce losslessly enough
    /// for aggregation purposes; text and null do not coerce.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text value, if this is a `Text`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A named-column table of [`Value`] rows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Creates an empty frame with the given column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a frame from column names and rows.
    ///
    /// # Panics
    ///
    /// Panics if any row's length differs from the column count.
    #[must_use]
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row);
        }
        frame
    }

    /// Returns the column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows, in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Returns mutable access to the rows.
    ///
    /// Rows keep their arity; only cell values may be replaced.
    pub fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the position of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Returns the cell at `(row, column-name)`, or `None` if either is
    /// out of range.
    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Appends a row.
    ///
    /// # Panics
    ///
    /// Panics if the row's length differs from the column count.
    pub fn push_row(&mut self, row: Vec<Value>) {
        assert_eq!(
            row.len(),
            self.columns.len(),
            "row arity {} does not match {} columns",
            row.len(),
            self.columns.len(),
        );
        self.rows.push(row);
    }

    /// Renames a column in place. Returns `false` if `from` is absent.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_owned();
                true
            }
            None => false,
        }
    }

    /// Removes a column and its cells. Returns `false` if absent.
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// Returns an iterator over one column's cells.
    ///
    /// Empty iterator if the column is absent.
    pub fn column_values<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.map(|i| &row[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_rows(
            vec!["country".to_owned(), "party_id".to_owned(), "eu_position".to_owned()],
            vec![
                vec!["bel".into(), Value::Int(102), Value::Real(6.5)],
                vec!["bel".into(), Value::Int(103), Value::Null],
            ],
        )
    }

    #[test]
    fn get_by_name_and_row() {
        let frame = sample();
        assert_eq!(frame.get(0, "party_id"), Some(&Value::Int(102)));
        assert_eq!(frame.get(1, "eu_position"), Some(&Value::Null));
        assert_eq!(frame.get(0, "missing"), None);
        assert_eq!(frame.get(9, "country"), None);
    }

    #[test]
    fn rename_and_drop_column() {
        let mut frame = sample();
        assert!(frame.rename_column("eu_position", "position"));
        assert!(!frame.rename_column("eu_position", "position"));
        assert_eq!(frame.get(0, "position"), Some(&Value::Real(6.5)));

        assert!(frame.drop_column("party_id"));
        assert_eq!(frame.columns(), ["country", "position"]);
        assert_eq!(frame.rows()[0].len(), 2);
    }

    #[test]
    fn column_values_iterates_cells() {
        let frame = sample();
        let ids: Vec<Option<i64>> = frame
            .column_values("party_id")
            .map(Value::as_i64)
            .collect();
        assert_eq!(ids, vec![Some(102), Some(103)]);
        assert_eq!(frame.column_values("missing").count(), 0);
    }

    #[test]
    fn int_coerces_to_float() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::Text("4".to_owned()).as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    #[should_panic(expected = "row arity")]
    fn push_row_rejects_wrong_arity() {
        let mut frame = Frame::new(vec!["a".to_owned()]);
        frame.push_row(vec![Value::Int(1), Value::Int(2)]);
    }
}
