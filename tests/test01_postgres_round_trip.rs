#![cfg(feature = "test-utils")]

use std::sync::Arc;

use papergres::prelude::*;
use papergres::test_utils::{setup_postgres_embedded, stop_postgres_embedded};

papergres::record! {
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Book {
        #[pk]
        pub book_id: Option<i64>,
        pub title: String,
        pub author: String,
        pub created_by: String,
    }
}

const DDL: &str = "CREATE SCHEMA IF NOT EXISTS paper;
CREATE TABLE IF NOT EXISTS paper.book (
    book_id SERIAL PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    created_by TEXT NOT NULL
);";

#[test]
fn test01_insert_then_select_by_generated_id() -> Result<(), Box<dyn std::error::Error>> {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    let pg = setup_postgres_embedded("papergres_round_trip")?;
    let settings = pg.settings.clone();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let registry = Arc::new(ConnectionRegistry::postgres());
        let db = Database::with_registry(settings, Arc::clone(&registry));
        db.ping().await?;

        let ddl = db.query(DDL, vec![]).exec_non_query().await;
        assert!(ddl.is_ok(), "{ddl}");

        let book = Book {
            book_id: None,
            title: "The Martian".into(),
            author: "Andy Weir".into(),
            created_by: "papergres".into(),
        };
        let inserted = db.schema("paper").insert(&book).await;
        assert!(inserted.is_ok(), "{inserted}");
        assert_eq!(inserted.rows_affected.count, Some(1));
        let id = inserted
            .last_insert_id
            .id
            .clone()
            .expect("insert returns the generated key");

        let mut fetched = Book::default();
        let result = db
            .query(
                "SELECT * FROM paper.book WHERE book_id = $1",
                vec![id.clone().into()],
            )
            .exec_single(&mut fetched)
            .await;
        assert!(result.is_ok(), "{result}");
        assert_eq!(result.rows_returned, 1);
        assert_eq!(fetched.book_id, id.as_int());
        assert_eq!(
            Book {
                book_id: fetched.book_id,
                ..book.clone()
            },
            fetched
        );

        // client-supplied key
        let seeded = Book {
            book_id: Some(1000),
            title: "Artemis".into(),
            ..book.clone()
        };
        let result = db.schema("paper").insert_with_pk(&seeded).await;
        assert!(result.is_ok(), "{result}");
        assert_eq!(result.last_insert_id.id, Some(PrimaryKey::Int(1000)));

        let mut found: Vec<Book> = Vec::new();
        let result = db
            .query(
                "SELECT * FROM paper.book WHERE book_id IN (?) ORDER BY book_id",
                vec![SqlValue::List(vec![id.into(), SqlValue::Int(1000)])],
            )
            .exec_all_in(&mut found)
            .await;
        assert!(result.is_ok(), "{result}");
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].title, "Artemis");

        let mut none = Book::default();
        let result = db
            .query("SELECT * FROM paper.book WHERE book_id = $1", vec![SqlValue::Int(-1)])
            .exec_single(&mut none)
            .await;
        assert!(matches!(result.err, Some(PapergresError::NoRowsOrTooMany(0))));

        let updated = db
            .query(
                "UPDATE paper.book SET created_by = $1 WHERE author = $2",
                vec!["tests".into(), "Andy Weir".into()],
            )
            .exec_non_query()
            .await;
        assert_eq!(updated.rows_affected.count, Some(2));

        assert!(db.stats()?.max_size >= 1);

        let counted = papergres::exec(
            "SELECT count(*) AS n FROM paper.book",
            db.settings(),
            vec![],
        )
        .await;
        assert!(counted.is_ok(), "{counted}");
        assert_eq!(counted.rows_affected.count, Some(1));
        let cleared = papergres::exec_non_query(
            "DELETE FROM paper.book WHERE book_id = $1",
            db.settings(),
            vec![SqlValue::Int(1000)],
        )
        .await;
        assert_eq!(cleared.rows_affected.count, Some(1));

        let mut fresh_settings = db.settings().clone();
        fresh_settings.database = Some("papergres_created".to_string());
        let fresh = Database::with_registry(fresh_settings, Arc::clone(&registry));
        assert!(fresh.ping().await.is_err());
        let created = fresh.create_database().await;
        assert!(created.is_ok(), "{created}");
        fresh.ping().await?;

        registry.shutdown();
        Ok::<(), PapergresError>(())
    })?;

    stop_postgres_embedded(pg);
    Ok(())
}
