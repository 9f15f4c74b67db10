//! Statement execution: dispatch by mode, timing, and the per-statement log event.

mod dispatch;
pub mod repeat;
mod targets;

use std::time::Instant;

use tracing::debug;

pub use dispatch::{ExecMode, LAST_INSERT_ID_COLUMN, Outcome, dispatch, insert_meta};
pub use repeat::{Repeat, RepeatOutcome};
pub use targets::Target;

use crate::query::Query;
use crate::results::QueryResult;

/// Execute `query` against `target`, timing it and capturing the outcome.
///
/// Failures are recorded in [`QueryResult::err`]. A `debug` event on target
/// `papergres::exec` carries the rendered query and result.
pub async fn execute(
    target: Target<'_>,
    query: &Query,
    mode: ExecMode,
    info: Option<&str>,
) -> QueryResult {
    let started = Instant::now();
    let outcome = dispatch(target, mode, &query.sql, &query.args).await;

    let mut result = QueryResult::new();
    result.execution_time = started.elapsed();
    match outcome {
        Ok(Outcome::Rows(rows)) => result.set_rows(rows),
        Ok(Outcome::Meta(meta)) => result.set_meta(meta),
        Err(err) => result.err = Some(err),
    }

    debug!(
        target: "papergres::exec",
        elapsed_ms = u64::try_from(result.execution_time.as_millis()).unwrap_or(u64::MAX),
        rows_returned = result.rows_returned,
        info = info.unwrap_or_default(),
        query = %query,
        result = %result,
        "executed query"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PapergresError;
    use crate::test_utils::mock::{MockConnection, mock_database};
    use crate::types::SqlValue;

    #[tokio::test]
    async fn single_requires_exactly_one_row() {
        let (db, conn) = mock_database(MockConnection::new());
        let query = db.query("SELECT $1", vec![SqlValue::Int(5)]);
        let result = execute(Target::Connection(conn.as_ref()), &query, ExecMode::Single, None).await;
        assert!(result.is_ok());
        assert_eq!(result.rows_returned, 1);

        conn.set_row_count(0);
        let result = execute(Target::Connection(conn.as_ref()), &query, ExecMode::Single, None).await;
        assert!(matches!(result.err, Some(PapergresError::NoRowsOrTooMany(0))));
    }

    #[tokio::test]
    async fn many_counts_rows() {
        let (db, conn) = mock_database(MockConnection::new());
        conn.set_row_count(3);
        let query = db.query("SELECT $1", vec![SqlValue::Int(5)]);
        let result = execute(Target::Connection(conn.as_ref()), &query, ExecMode::Many, None).await;
        assert_eq!(result.rows_returned, 3);
        assert_eq!(result.rows.len(), 3);
    }

    #[tokio::test]
    async fn non_query_reports_affected_rows_without_insert_id() {
        let (db, conn) = mock_database(MockConnection::new());
        let query = db.query("UPDATE paper.book SET title = $1", vec![SqlValue::from("x")]);
        let result =
            execute(Target::Connection(conn.as_ref()), &query, ExecMode::NonQuery, None).await;
        assert!(result.is_ok());
        assert_eq!(result.rows_affected.count, Some(1));
        assert!(matches!(
            result.last_insert_id.err,
            Some(PapergresError::MissingMetadata(_))
        ));
    }

    #[tokio::test]
    async fn insert_captures_generated_key() {
        let (db, conn) = mock_database(MockConnection::new());
        let query = db.query(
            "INSERT INTO paper.book (title) VALUES ($1) RETURNING book_id as LastInsertId;",
            vec![SqlValue::from("The Martian")],
        );
        let result = execute(Target::Connection(conn.as_ref()), &query, ExecMode::Insert, None).await;
        assert!(result.is_ok());
        assert!(result.last_insert_id.id.is_some());
        assert_eq!(result.rows_affected.count, Some(1));
        assert_eq!(conn.executed(), 1);
    }

    #[tokio::test]
    async fn failures_are_recorded_not_raised() {
        let (db, conn) = mock_database(MockConnection::new().fail_when(|_, _| true));
        let query = db.query("SELECT 1", vec![]);
        let result = execute(Target::Connection(conn.as_ref()), &query, ExecMode::Many, None).await;
        assert!(matches!(result.err, Some(PapergresError::ExecutionError(_))));
    }
}
