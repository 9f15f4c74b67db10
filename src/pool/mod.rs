//! Connection seams: what the execution layer needs from a pooled database.
//!
//! [`DbConnection`] is implemented by [`PgConnection`](crate::postgres::PgConnection)
//! for real servers and by the in-memory mock under `test_utils` for tests.

pub mod registry;

pub use registry::{ConnectionRegistry, Connector};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PapergresError;
use crate::results::{ExecMeta, ResultSet};
use crate::types::SqlValue;

/// Pool counters reported by [`DbConnection::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Maximum number of connections the pool will open.
    pub max_size: usize,
    /// Connections currently open.
    pub size: usize,
    /// Open connections not checked out.
    pub available: usize,
    /// Tasks waiting for a connection.
    pub waiting: usize,
}

/// A pooled handle to one database, shared by every query that targets it.
#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Run a statement that returns no rows.
    async fn execute_non_query(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecMeta, PapergresError>;

    /// Run a query that must return exactly one row.
    async fn query_one(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError>;

    /// Run a query returning any number of rows.
    async fn query_many(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError>;

    /// Prepare `sql` once for repeated execution. The handle releases its
    /// server-side resources when dropped.
    async fn prepare(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>, PapergresError>;

    async fn ping(&self) -> Result<(), PapergresError>;

    fn stats(&self) -> PoolStats;

    /// How many statements this connection can usefully run at once.
    fn max_concurrency(&self) -> usize {
        self.stats().max_size.max(1)
    }

    /// Stop handing out pooled connections.
    fn close(&self);
}

/// A statement prepared once and executed many times, possibly concurrently.
#[async_trait]
pub trait PreparedStatement: Send + Sync {
    fn sql(&self) -> &str;

    async fn execute_non_query(&self, args: &[SqlValue]) -> Result<ExecMeta, PapergresError>;

    async fn query_one(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError>;

    async fn query_many(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError>;
}
