use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::SqlValue;

/// Rows returned by a query, sharing one set of column names.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    /// Rows the server reported as affected
    pub rows_affected: usize,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row. Ignored until column names are set.
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        if let (Some(names), Some(index)) = (&self.column_names, &self.column_index) {
            self.results
                .push(DbRow::with_index(Arc::clone(names), Arc::clone(index), values));
            self.rows_affected += 1;
        }
    }

    pub fn add_row(&mut self, row: DbRow) {
        if self.column_names.is_none() {
            self.set_column_names(Arc::clone(&row.column_names));
        }
        self.results.push(row);
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&DbRow> {
        self.results.first()
    }
}

impl From<DbRow> for ResultSet {
    fn from(row: DbRow) -> Self {
        let mut set = ResultSet::with_capacity(1);
        set.add_row(row);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut set = ResultSet::with_capacity(2);
        set.set_column_names(Arc::new(vec!["id".into()]));
        set.add_row_values(vec![SqlValue::Int(1)]);
        set.add_row_values(vec![SqlValue::Int(2)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows_affected, 2);
        assert!(Arc::ptr_eq(
            &set.results[0].column_names,
            &set.results[1].column_names
        ));
        assert_eq!(set.results[1].get("id"), Some(&SqlValue::Int(2)));
    }

    #[test]
    fn values_without_columns_are_dropped() {
        let mut set = ResultSet::default();
        set.add_row_values(vec![SqlValue::Int(1)]);
        assert!(set.is_empty());
    }
}
