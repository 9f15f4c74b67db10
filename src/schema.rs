use crate::database::Database;
use crate::error::PapergresError;
use crate::executor::RepeatOutcome;
use crate::query::Query;
use crate::query_builder::{build_insert, insert_args};
use crate::record::Record;
use crate::results::QueryResult;

/// Record operations scoped to one Postgres schema.
#[derive(Clone, Debug)]
pub struct Schema {
    pub name: String,
    pub database: Database,
}

impl Schema {
    pub(crate) fn new(name: impl Into<String>, database: Database) -> Self {
        Self {
            name: name.into(),
            database,
        }
    }

    /// Insert query for `record`, leaving the primary key to the database.
    ///
    /// # Errors
    /// Returns `PapergresError::InvalidRecordShape` if the record cannot be mapped to a row.
    pub fn generate_insert<R: Record>(&self, record: &R) -> Result<Query, PapergresError> {
        self.generate(record, false)
    }

    /// Insert query for `record` that also writes its primary key.
    ///
    /// # Errors
    /// Returns `PapergresError::InvalidRecordShape` if the record cannot be mapped to a row.
    pub fn generate_insert_with_pk<R: Record>(&self, record: &R) -> Result<Query, PapergresError> {
        self.generate(record, true)
    }

    fn generate<R: Record>(&self, record: &R, with_pk: bool) -> Result<Query, PapergresError> {
        let stmt = build_insert(record, &self.name, with_pk)?;
        Ok(Query::from_insert(self.database.clone(), stmt))
    }

    /// Insert `record` and capture the key the database generated.
    pub async fn insert<R: Record>(&self, record: &R) -> QueryResult {
        match self.generate_insert(record) {
            Ok(query) => query.exec().await,
            Err(err) => QueryResult::failed(err),
        }
    }

    /// Insert `record` including its client-supplied primary key.
    pub async fn insert_with_pk<R: Record>(&self, record: &R) -> QueryResult {
        match self.generate_insert_with_pk(record) {
            Ok(query) => query.exec().await,
            Err(err) => QueryResult::failed(err),
        }
    }

    /// Insert every record concurrently; `results[i]` belongs to `records[i]`.
    ///
    /// An empty slice fails with `EmptyBatch` and runs nothing.
    pub async fn insert_all<R: Record>(&self, records: &[R]) -> RepeatOutcome {
        let Some(first) = records.first() else {
            return RepeatOutcome::failed(PapergresError::EmptyBatch);
        };
        let query = match self.generate_insert(first) {
            Ok(query) => query,
            Err(err) => return RepeatOutcome::failed(err),
        };
        let args = match records
            .iter()
            .map(|r| insert_args(r, false))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(args) => args,
            Err(err) => return RepeatOutcome::failed(err),
        };
        query
            .repeat(records.len(), |i| args[i].clone())
            .run()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock::{Book, MockConnection, mock_database, sample_book};
    use crate::types::{PrimaryKey, SqlValue};

    #[tokio::test]
    async fn insert_all_on_empty_slice_is_an_error() {
        let (db, conn) = mock_database(MockConnection::new());
        let outcome = db.schema("paper").insert_all::<Book>(&[]).await;
        assert!(outcome.results.is_empty());
        assert!(matches!(outcome.error, Some(PapergresError::EmptyBatch)));
        assert_eq!(conn.prepared(), 0);
    }

    #[tokio::test]
    async fn insert_all_keeps_record_order() {
        let (db, _conn) = mock_database(MockConnection::new());
        let books: Vec<Book> = ["Artemis", "The Martian", "Project Hail Mary"]
            .iter()
            .map(|title| Book {
                title: (*title).to_string(),
                ..sample_book()
            })
            .collect();
        let outcome = db.schema("paper").insert_all(&books).await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results.iter().all(|r| r.last_insert_id.id.is_some()));
    }

    #[tokio::test]
    async fn insert_returns_generated_key() {
        let (db, conn) = mock_database(MockConnection::new());
        let result = db.schema("paper").insert(&sample_book()).await;
        assert!(result.is_ok());
        assert!(matches!(result.last_insert_id.id, Some(PrimaryKey::Int(_))));
        let sql = conn.last_sql().unwrap();
        assert!(sql.starts_with("INSERT INTO paper.book (title, author, created_by)"));
    }

    #[tokio::test]
    async fn insert_with_pk_sends_the_key() {
        let (db, conn) = mock_database(MockConnection::new());
        let book = Book {
            book_id: 42,
            ..sample_book()
        };
        let result = db.schema("paper").insert_with_pk(&book).await;
        assert!(result.is_ok());
        assert_eq!(
            conn.last_args().unwrap().first(),
            Some(&SqlValue::Int(42))
        );
    }

    #[test]
    fn generated_insert_is_flagged() {
        let (db, _conn) = mock_database(MockConnection::new());
        let query = db.schema("paper").generate_insert(&sample_book()).unwrap();
        assert!(query.is_insert());
        assert_eq!(
            query.sql,
            "INSERT INTO paper.book (title, author, created_by) VALUES ($1,$2,$3) RETURNING book_id as LastInsertId;"
        );
        assert!(!db.query("SELECT 1", vec![]).is_insert());
    }
}
