use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Object, Pool};
use tokio_postgres::{SimpleQueryMessage, Statement};

use super::params::Params;
use super::query::build_result_set_from_statement;
use crate::error::PapergresError;
use crate::pool::{DbConnection, PoolStats, PreparedStatement};
use crate::results::{ExecMeta, ResultSet};
use crate::types::SqlValue;

/// A `deadpool_postgres` pool behind the [`DbConnection`] seam.
#[derive(Clone, Debug)]
pub struct PgConnection {
    pool: Pool,
}

impl PgConnection {
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl DbConnection for PgConnection {
    async fn execute_non_query(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecMeta, PapergresError> {
        let client = self.pool.get().await?;
        if args.is_empty() {
            // simple protocol so multi-statement scripts run as one call
            let messages = client.simple_query(sql).await?;
            let rows_affected = messages.iter().rev().find_map(|m| match m {
                SimpleQueryMessage::CommandComplete(n) => Some(*n),
                _ => None,
            });
            return Ok(ExecMeta {
                last_insert_id: None,
                rows_affected,
            });
        }
        let stmt = client.prepare_cached(sql).await?;
        execute_on(&client, &stmt, args).await
    }

    async fn query_one(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        exactly_one(self.query_many(sql, args).await?)
    }

    async fn query_many(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        let client = self.pool.get().await?;
        let stmt = client.prepare_cached(sql).await?;
        query_on(&client, &stmt, args).await
    }

    async fn prepare(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>, PapergresError> {
        let client = self.pool.get().await?;
        let stmt = client.prepare(sql).await?;
        Ok(Arc::new(PgPrepared {
            sql: sql.to_string(),
            stmt,
            client,
        }))
    }

    async fn ping(&self) -> Result<(), PapergresError> {
        let client = self.pool.get().await?;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn stats(&self) -> PoolStats {
        let status = self.pool.status();
        PoolStats {
            max_size: status.max_size,
            size: status.size,
            available: usize::try_from(status.available).unwrap_or(0),
            waiting: status.waiting,
        }
    }

    fn close(&self) {
        self.pool.close();
    }
}

/// A statement prepared on one checked-out client.
///
/// Concurrent executions are pipelined on that client. Dropping the handle
/// closes the statement and returns the client to the pool.
pub struct PgPrepared {
    sql: String,
    // declared before `client` so the statement is closed first
    stmt: Statement,
    client: Object,
}

#[async_trait]
impl PreparedStatement for PgPrepared {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn execute_non_query(&self, args: &[SqlValue]) -> Result<ExecMeta, PapergresError> {
        execute_on(&self.client, &self.stmt, args).await
    }

    async fn query_one(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        exactly_one(query_on(&self.client, &self.stmt, args).await?)
    }

    async fn query_many(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        query_on(&self.client, &self.stmt, args).await
    }
}

async fn execute_on(
    client: &Object,
    stmt: &Statement,
    args: &[SqlValue],
) -> Result<ExecMeta, PapergresError> {
    let converted = Params::convert(args)?;
    let rows = client.execute(stmt, converted.as_refs()).await?;
    Ok(ExecMeta {
        last_insert_id: None,
        rows_affected: Some(rows),
    })
}

async fn query_on(
    client: &Object,
    stmt: &Statement,
    args: &[SqlValue],
) -> Result<ResultSet, PapergresError> {
    let converted = Params::convert(args)?;
    let rows = client.query(stmt, converted.as_refs()).await?;
    build_result_set_from_statement(stmt, &rows)
}

fn exactly_one(rows: ResultSet) -> Result<ResultSet, PapergresError> {
    if rows.len() == 1 {
        Ok(rows)
    } else {
        Err(PapergresError::NoRowsOrTooMany(rows.len()))
    }
}
