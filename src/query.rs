use std::fmt;

use crate::config::prettify_connection_string;
use crate::database::Database;
use crate::executor::{ExecMode, Repeat, Target, execute};
use crate::query_builder::InsertStatement;
use crate::results::{FromRow, QueryResult};
use crate::translation::expand_in;
use crate::types::SqlValue;

/// SQL text bound to a database and its arguments.
///
/// Created by [`Database::query`] or by the insert generators on
/// [`Schema`](crate::Schema). Every `exec*` method returns a [`QueryResult`]
/// whose `err` field carries any failure.
#[derive(Clone)]
pub struct Query {
    pub sql: String,
    pub database: Database,
    pub args: Vec<SqlValue>,
    pub(crate) insert: bool,
}

impl Query {
    pub(crate) fn new(database: Database, sql: impl Into<String>, args: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            database,
            args,
            insert: false,
        }
    }

    pub(crate) fn from_insert(database: Database, stmt: InsertStatement) -> Self {
        Self {
            sql: stmt.sql,
            database,
            args: stmt.args,
            insert: true,
        }
    }

    /// Whether this query was generated from a record and returns its key.
    #[must_use]
    pub fn is_insert(&self) -> bool {
        self.insert
    }

    /// Same SQL and database with different arguments.
    #[must_use]
    pub fn with_args(&self, args: Vec<SqlValue>) -> Self {
        Self {
            sql: self.sql.clone(),
            database: self.database.clone(),
            args,
            insert: self.insert,
        }
    }

    /// Run the statement. Generated inserts capture the new key; anything
    /// else runs as a non-query.
    pub async fn exec(&self) -> QueryResult {
        let mode = if self.insert {
            ExecMode::Insert
        } else {
            ExecMode::NonQuery
        };
        self.run(mode).await
    }

    /// Run the statement without fetching rows.
    pub async fn exec_non_query(&self) -> QueryResult {
        self.run(ExecMode::NonQuery).await
    }

    /// Fetch exactly one row into `dest`.
    pub async fn exec_single<T: FromRow>(&self, dest: &mut T) -> QueryResult {
        let mut result = self.run(ExecMode::Single).await;
        if let Some(row) = result.rows.first() {
            match T::from_row(row) {
                Ok(value) => *dest = value,
                Err(err) => result.err = Some(err),
            }
        }
        result
    }

    /// Fetch every row into `dest`, replacing its contents.
    pub async fn exec_all<T: FromRow>(&self, dest: &mut Vec<T>) -> QueryResult {
        let mut result = self.run(ExecMode::Many).await;
        if result.is_ok() {
            match result.decode_rows::<T>() {
                Ok(rows) => *dest = rows,
                Err(err) => result.err = Some(err),
            }
        }
        result
    }

    /// Like [`exec_all`](Self::exec_all) for SQL written with `?` markers,
    /// where a [`SqlValue::List`] argument expands to one placeholder per element.
    pub async fn exec_all_in<T: FromRow>(&self, dest: &mut Vec<T>) -> QueryResult {
        match expand_in(&self.sql, &self.args) {
            Ok(expanded) => {
                let mut query = self.with_args(expanded.args);
                query.sql = expanded.sql;
                query.exec_all(dest).await
            }
            Err(err) => QueryResult::failed(err),
        }
    }

    /// Execute this statement `n` times, binding iteration `i` to `params(i)`.
    pub fn repeat<F>(&self, n: usize, params: F) -> Repeat<'_, F>
    where
        F: Fn(usize) -> Vec<SqlValue>,
    {
        Repeat::new(self, params, n)
    }

    async fn run(&self, mode: ExecMode) -> QueryResult {
        let conn = match self.database.connection() {
            Ok(conn) => conn,
            Err(err) => return QueryResult::failed(err),
        };
        execute(Target::Connection(conn.as_ref()), self, mode, None).await
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("args", &self.args)
            .field("insert", &self.insert)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\nQuery:\n{}\n", self.sql)?;
        if !self.args.is_empty() {
            f.write_str("Args:")?;
            for (i, arg) in self.args.iter().enumerate() {
                write!(f, "\n\t${}: {arg}", i + 1)?;
            }
        }
        write!(
            f,
            "\nConnection: {}\n",
            prettify_connection_string(self.database.connection_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PapergresError;
    use crate::test_utils::mock::{MockConnection, mock_database};

    struct Name(String);

    impl FromRow for Name {
        fn from_row(row: &crate::DbRow) -> Result<Self, PapergresError> {
            row.decode("arg0").map(Name)
        }
    }

    #[tokio::test]
    async fn exec_single_decodes_the_row() {
        let (db, _conn) = mock_database(MockConnection::new());
        let query = db.query("SELECT $1", vec![SqlValue::from("Mark Watney")]);
        let mut dest = Name(String::new());
        let result = query.exec_single(&mut dest).await;
        assert!(result.is_ok());
        assert_eq!(result.rows_returned, 1);
        assert_eq!(dest.0, "Mark Watney");
    }

    #[tokio::test]
    async fn exec_single_leaves_dest_on_failure() {
        let (db, conn) = mock_database(MockConnection::new());
        conn.set_row_count(2);
        let mut dest = crate::DbRow::new(std::sync::Arc::new(vec![]), vec![]);
        let result = db.query("SELECT 1", vec![]).exec_single(&mut dest).await;
        assert!(matches!(result.err, Some(PapergresError::NoRowsOrTooMany(2))));
        assert!(dest.values.is_empty());
    }

    #[tokio::test]
    async fn exec_all_in_expands_lists() {
        let (db, conn) = mock_database(MockConnection::new());
        let query = db.query(
            "SELECT * FROM paper.book WHERE book_id IN (?) AND author = ?",
            vec![
                SqlValue::List(vec![SqlValue::Int(1), SqlValue::Int(2)]),
                SqlValue::from("Andy Weir"),
            ],
        );
        let mut rows: Vec<crate::DbRow> = Vec::new();
        let result = query.exec_all_in(&mut rows).await;
        assert!(result.is_ok());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values.len(), 3);
        assert_eq!(
            conn.last_sql().as_deref(),
            Some("SELECT * FROM paper.book WHERE book_id IN ($1, $2) AND author = $3")
        );
    }

    #[tokio::test]
    async fn plain_exec_runs_as_non_query() {
        let (db, _conn) = mock_database(MockConnection::new());
        let result = db
            .query("DELETE FROM paper.book WHERE book_id = $1", vec![SqlValue::Int(9)])
            .exec()
            .await;
        assert!(result.is_ok());
        assert_eq!(result.rows_affected.count, Some(1));
        assert!(result.last_insert_id.err.is_some());
    }

    #[test]
    fn display_lists_args_and_masks_password() {
        let (db, _conn) = mock_database(MockConnection::new());
        let query = db.query(
            "SELECT * FROM paper.book WHERE title = $1 AND author = $2",
            vec![SqlValue::from("Artemis"), SqlValue::Null],
        );
        let text = query.to_string();
        assert!(text.contains("Query:\nSELECT * FROM paper.book"));
        assert!(text.contains("Args:\n\t$1: Artemis\n\t$2: NULL"));
        assert!(text.contains("password=********"));
        assert!(!text.contains("secret"));
    }
}
