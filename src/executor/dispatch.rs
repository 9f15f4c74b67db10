use crate::error::PapergresError;
use crate::results::{ExecMeta, ResultSet};
use crate::types::{PrimaryKey, SqlValue};

use super::targets::Target;

/// Column an insert statement aliases its generated key to.
pub const LAST_INSERT_ID_COLUMN: &str = "lastinsertid";

/// How a statement's outcome is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Exactly one row.
    Single,
    /// Any number of rows.
    Many,
    /// No rows; best-effort affected count.
    NonQuery,
    /// Generated key from `RETURNING ... as LastInsertId` plus affected count.
    Insert,
}

/// Raw result of a dispatched statement.
#[derive(Debug)]
pub enum Outcome {
    Rows(ResultSet),
    Meta(ExecMeta),
}

/// Run `sql` against `target` in `mode`.
///
/// For a prepared target `sql` is informational; the handle's own text runs.
///
/// # Errors
/// Returns driver errors, or `NoRowsOrTooMany` for a `Single` fetch that did
/// not produce exactly one row.
pub async fn dispatch(
    target: Target<'_>,
    mode: ExecMode,
    sql: &str,
    args: &[SqlValue],
) -> Result<Outcome, PapergresError> {
    match (mode, target) {
        (ExecMode::Single, Target::Connection(conn)) => {
            conn.query_one(sql, args).await.map(Outcome::Rows)
        }
        (ExecMode::Single, Target::Prepared(stmt)) => stmt.query_one(args).await.map(Outcome::Rows),
        (ExecMode::Many, Target::Connection(conn)) => {
            conn.query_many(sql, args).await.map(Outcome::Rows)
        }
        (ExecMode::Many, Target::Prepared(stmt)) => stmt.query_many(args).await.map(Outcome::Rows),
        (ExecMode::NonQuery, Target::Connection(conn)) => {
            conn.execute_non_query(sql, args).await.map(Outcome::Meta)
        }
        (ExecMode::NonQuery, Target::Prepared(stmt)) => {
            stmt.execute_non_query(args).await.map(Outcome::Meta)
        }
        (ExecMode::Insert, Target::Connection(conn)) => {
            let rows = conn.query_many(sql, args).await?;
            Ok(Outcome::Meta(insert_meta(&rows)))
        }
        (ExecMode::Insert, Target::Prepared(stmt)) => {
            let rows = stmt.query_many(args).await?;
            Ok(Outcome::Meta(insert_meta(&rows)))
        }
    }
}

/// Generated key from the first returned row. A missing row, a missing
/// `lastinsertid` column or a NULL all leave the key unset; zero is a valid key.
#[must_use]
pub fn insert_meta(rows: &ResultSet) -> ExecMeta {
    let last_insert_id = rows
        .first()
        .and_then(|row| row.get_ignore_case(LAST_INSERT_ID_COLUMN))
        .and_then(PrimaryKey::from_value);
    ExecMeta {
        last_insert_id,
        rows_affected: Some(rows.len() as u64),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::results::DbRow;

    fn returning(value: SqlValue) -> ResultSet {
        DbRow::new(Arc::new(vec!["lastinsertid".to_string()]), vec![value]).into()
    }

    #[test]
    fn zero_is_a_valid_generated_key() {
        let meta = insert_meta(&returning(SqlValue::Int(0)));
        assert_eq!(meta.last_insert_id, Some(PrimaryKey::Int(0)));
        assert_eq!(meta.rows_affected, Some(1));
    }

    #[test]
    fn null_or_absent_key_is_missing() {
        assert_eq!(insert_meta(&returning(SqlValue::Null)).last_insert_id, None);
        let meta = insert_meta(&ResultSet::default());
        assert_eq!(meta.last_insert_id, None);
        assert_eq!(meta.rows_affected, Some(0));
    }

    #[test]
    fn key_column_is_matched_case_insensitively() {
        let rows: ResultSet =
            DbRow::new(Arc::new(vec!["LastInsertId".to_string()]), vec![SqlValue::from("abc")])
                .into();
        assert_eq!(
            insert_meta(&rows).last_insert_id,
            Some(PrimaryKey::Text("abc".to_string()))
        );
    }
}
