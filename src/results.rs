//! Execution outcomes: the per-statement [`QueryResult`] and the rows it carries.

pub mod result_set;
pub mod row;

use std::fmt;
use std::time::Duration;

pub use result_set::ResultSet;
pub use row::{DbRow, FromRow};

use crate::error::PapergresError;
use crate::types::PrimaryKey;

/// Generated id reported by an insert. `err` is set when the driver supplied none.
#[derive(Debug, Default)]
pub struct LastInsertId {
    pub id: Option<PrimaryKey>,
    pub err: Option<PapergresError>,
}

/// Affected-row count. `err` is set when the driver supplied none.
#[derive(Debug, Default)]
pub struct RowsAffected {
    pub count: Option<u64>,
    pub err: Option<PapergresError>,
}

/// Metadata a driver reports for a non-query or insert statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecMeta {
    pub last_insert_id: Option<PrimaryKey>,
    pub rows_affected: Option<u64>,
}

/// Outcome of one statement execution.
///
/// Failure is partial: `err` covers the statement itself while
/// `last_insert_id.err` and `rows_affected.err` only record that a piece of
/// metadata was unavailable, which is expected for some statement shapes.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub last_insert_id: LastInsertId,
    pub rows_affected: RowsAffected,
    pub rows_returned: usize,
    pub execution_time: Duration,
    pub err: Option<PapergresError>,
    /// Rows fetched by a query; empty for non-query and insert executions.
    pub rows: ResultSet,
}

impl QueryResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failed(err: PapergresError) -> Self {
        Self {
            err: Some(err),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Record driver metadata, flagging whichever part is absent.
    pub fn set_meta(&mut self, meta: ExecMeta) {
        if meta.last_insert_id.is_none() {
            self.last_insert_id.err = Some(PapergresError::MissingMetadata(
                "no LastInsertId returned".to_string(),
            ));
        }
        if meta.rows_affected.is_none() {
            self.rows_affected.err = Some(PapergresError::MissingMetadata(
                "no RowsAffected returned".to_string(),
            ));
        }
        self.last_insert_id.id = meta.last_insert_id;
        self.rows_affected.count = meta.rows_affected;
    }

    pub(crate) fn set_rows(&mut self, rows: ResultSet) {
        self.rows_returned = rows.len();
        self.rows = rows;
    }

    /// Decode the fetched rows into `T`.
    ///
    /// # Errors
    /// Returns the first decode failure.
    pub fn decode_rows<T: FromRow>(&self) -> Result<Vec<T>, PapergresError> {
        self.rows.results.iter().map(T::from_row).collect()
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lid = match (&self.last_insert_id.err, &self.last_insert_id.id) {
            (Some(err), _) => err.to_string(),
            (None, Some(id)) => id.to_string(),
            (None, None) => String::new(),
        };
        let ra = match (&self.rows_affected.err, self.rows_affected.count) {
            (Some(err), _) => err.to_string(),
            (None, Some(count)) => count.to_string(),
            (None, None) => String::new(),
        };
        let err = self
            .err
            .as_ref()
            .map_or_else(|| "<nil>".to_string(), ToString::to_string);
        write!(
            f,
            "\nLastInsertId:  {lid}\nRowsAffected:  {ra}\nRowsReturned:  {}\nExecutionTime: {:?}\nError: {err}\n",
            self.rows_returned, self.execution_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_meta_flags_missing_parts_independently() {
        let mut r = QueryResult::new();
        r.set_meta(ExecMeta {
            last_insert_id: Some(PrimaryKey::Int(0)),
            rows_affected: None,
        });
        assert_eq!(r.last_insert_id.id, Some(PrimaryKey::Int(0)));
        assert!(r.last_insert_id.err.is_none());
        assert!(matches!(
            r.rows_affected.err,
            Some(PapergresError::MissingMetadata(_))
        ));
    }

    #[test]
    fn display_shows_metadata_errors() {
        let mut r = QueryResult::new();
        r.set_meta(ExecMeta {
            last_insert_id: None,
            rows_affected: Some(1),
        });
        let text = r.to_string();
        assert!(text.contains("LastInsertId:  no LastInsertId returned"));
        assert!(text.contains("RowsAffected:  1"));
        assert!(text.contains("Error: <nil>"));
    }
}
