//! The decoded form of an uploaded table.

use serde_json::{Map, Value as Json};

static NULL: Json = Json::Null;

/// One table row, keyed by column name.
pub type Row = Map<String, Json>;

/// Ordered columns and the rows decoded from an upload.
///
/// ```
/// use commonkit_rest::Table;
/// use serde_json::json;
///
/// let mut table = Table::new(vec!["name".into(), "age".into()]);
/// table.push_row(json!({"name": "ann", "age": 41}).as_object().unwrap().clone());
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.to_json(), json!([{"name": "ann", "age": 41}]));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table with the given columns.
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from rows, taking columns in first-seen order.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Returns the row at `index`.
    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Replaces the row at `index`; out-of-range indices are ignored.
    ///
    /// Keys the table has no column for are appended to the columns.
    pub fn set_row(&mut self, index: usize, row: Row) {
        let Some(slot) = self.rows.get_mut(index) else {
            return;
        };
        for key in row.keys() {
            if !self.columns.contains(key) {
                self.columns.push(key.clone());
            }
        }
        *slot = row;
    }

    /// Returns the values of one column, `null` where a row lacks it.
    pub fn column(&self, name: &str) -> Vec<&Json> {
        self.rows
            .iter()
            .map(|row| row.get(name).unwrap_or(&NULL))
            .collect()
    }

    /// Converts the table to an array of row objects.
    pub fn to_json(&self) -> Json {
        Json::Array(self.rows.iter().cloned().map(Json::Object).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Json) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_set_row_extends_columns() {
        let mut table = Table::from_rows(vec![row(json!({"n": "x"})), row(json!({"n": "y"}))]);
        table.set_row(1, row(json!({"n": "y", "index": 1})));
        assert_eq!(table.columns(), ["n", "index"]);
        assert_eq!(table.column("index"), vec![&Json::Null, &json!(1)]);
    }

    #[test]
    fn test_set_row_out_of_range_is_ignored() {
        let mut table = Table::new(vec!["n".into()]);
        table.set_row(0, row(json!({"extra": true})));
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["n"]);
    }
}
