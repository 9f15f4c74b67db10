use std::collections::HashMap;
use std::sync::Arc;

use crate::error::PapergresError;
use crate::types::{FromSqlValue, SqlValue};

/// A row from a database query result
///
/// Column names and the name-to-index lookup are shared with every other
/// row of the same result set.
#[derive(Debug, Clone)]
pub struct DbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row
    pub values: Vec<SqlValue>,
    column_index: Arc<HashMap<String, usize>>,
}

impl DbRow {
    /// Create a row, building its own column lookup.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    pub(crate) fn with_index(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Column lookup that ignores ASCII case, for aliases Postgres folded to lower case.
    #[must_use]
    pub fn get_ignore_case(&self, column_name: &str) -> Option<&SqlValue> {
        self.get(column_name).or_else(|| {
            self.column_names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(column_name))
                .and_then(|idx| self.values.get(idx))
        })
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Decode a named column.
    ///
    /// # Errors
    /// Returns `PapergresError::DecodeError` if the column is absent or its
    /// value does not fit `T`.
    pub fn decode<T: FromSqlValue>(&self, column_name: &str) -> Result<T, PapergresError> {
        let value = self.get(column_name).ok_or_else(|| {
            PapergresError::DecodeError(format!("column {column_name} not in result set"))
        })?;
        T::from_sql_value(value)
            .map_err(|e| PapergresError::DecodeError(format!("column {column_name}: {e}")))
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

/// Destination type a fetched row can be bound into.
pub trait FromRow: Sized {
    /// # Errors
    /// Returns an error when a column is missing or has the wrong kind.
    fn from_row(row: &DbRow) -> Result<Self, PapergresError>;
}

impl FromRow for DbRow {
    fn from_row(row: &DbRow) -> Result<Self, PapergresError> {
        Ok(row.clone())
    }
}
