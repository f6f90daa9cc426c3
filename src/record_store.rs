//! In-memory record store: one row per (subject, visit) observation
//!
//! Rows keep the order they were loaded in. Derived views borrow the store
//! and select rows by index, so filtering and bucketing never copy or mutate
//! cells.

use crate::error::{ColumnRole, DatasetError, PipelineError};
use crate::value::Value;
use std::collections::HashMap;

/// A single observation row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<Value>,
}

impl Row {
    pub fn new(cells: Vec<Value>) -> Self {
        Self { cells }
    }

    /// Cell at a column position
    pub fn get(&self, column: usize) -> &Value {
        &self.cells[column]
    }

    pub(crate) fn set(&mut self, column: usize, value: Value) {
        self.cells[column] = value;
    }

    pub fn cells(&self) -> &[Value] {
        &self.cells
    }
}

/// Tabular dataset keyed by column name
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Row>,
}

impl RecordStore {
    /// Build a store, rejecting empty/duplicate column names and ragged rows
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, DatasetError> {
        if columns.is_empty() {
            return Err(DatasetError::EmptyHeader);
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(DatasetError::EmptyHeader);
            }
            if index.insert(name.clone(), i).is_some() {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.cells.len() != columns.len() {
                return Err(DatasetError::RaggedRow {
                    row: i + 1,
                    expected: columns.len(),
                    found: row.cells.len(),
                });
            }
        }

        Ok(Self {
            columns,
            index,
            rows,
        })
    }

    /// Column names in dataset order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Resolve a column name, failing fast when it does not exist
    pub fn column_index(&self, name: &str, role: ColumnRole) -> Result<usize, PipelineError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownColumn {
                column: name.to_string(),
                role,
            })
    }

    /// Cell lookup by row position and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let col = *self.index.get(column)?;
        self.rows.get(row).map(|r| r.get(col))
    }

    /// A view over every row
    pub fn view(&self) -> View<'_> {
        View {
            store: self,
            rows: (0..self.rows.len()).collect(),
        }
    }
}

/// Borrowed subset of a record store, in store row order
#[derive(Debug, Clone)]
pub struct View<'a> {
    store: &'a RecordStore,
    rows: Vec<usize>,
}

impl<'a> View<'a> {
    pub(crate) fn from_indices(store: &'a RecordStore, rows: Vec<usize>) -> Self {
        Self { store, rows }
    }

    pub fn store(&self) -> &'a RecordStore {
        self.store
    }

    /// Row positions (indices into the store) selected by this view
    pub fn row_indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate the selected rows
    pub fn iter(&self) -> impl Iterator<Item = &'a Row> + '_ {
        let store = self.store;
        self.rows.iter().map(move |&i| &store.rows[i])
    }

    /// Keep only rows matching a predicate, producing a new view
    pub fn retain_by<F>(&self, mut keep: F) -> View<'a>
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&i| keep(&self.store.rows[i]))
            .collect();
        View::from_indices(self.store, rows)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a store from string cells, parsing each with `Value::parse`
    pub(crate) fn store_from(columns: &[&str], rows: &[&[&str]]) -> RecordStore {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Value::parse(c)).collect()))
            .collect();
        RecordStore::new(columns, rows).unwrap()
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let result = RecordStore::new(vec!["a".into(), "a".into()], vec![]);
        assert!(matches!(result, Err(DatasetError::DuplicateColumn(c)) if c == "a"));
    }

    #[test]
    fn test_new_rejects_ragged_rows() {
        let result = RecordStore::new(
            vec!["a".into(), "b".into()],
            vec![Row::new(vec![Value::Missing])],
        );
        assert!(matches!(
            result,
            Err(DatasetError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_column_index_unknown_column() {
        let store = store_from(&["record_id"], &[&["S1"]]);
        let err = store.column_index("ikdc", ColumnRole::Variable).unwrap_err();
        assert_eq!(
            err,
            PipelineError::UnknownColumn {
                column: "ikdc".to_string(),
                role: ColumnRole::Variable
            }
        );
    }

    #[test]
    fn test_view_retain_preserves_order() {
        let store = store_from(&["id", "n"], &[&["a", "1"], &["b", "2"], &["c", "3"]]);
        let view = store.view().retain_by(|r| r.get(1).as_number() != Some(2.0));
        assert_eq!(view.row_indices(), &[0, 2]);
        assert_eq!(store.value(2, "id"), Some(&Value::Text("c".to_string())));
    }
}
