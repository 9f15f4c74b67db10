//! In-memory [`DbConnection`] for exercising the execution layer without a server.
//!
//! Queries echo their arguments back as one row with columns `arg0`, `arg1`, ...;
//! statements starting with `INSERT` return a `lastinsertid` row with an
//! increasing key starting at 1.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ConnectionSettings;
use crate::database::Database;
use crate::error::PapergresError;
use crate::pool::{ConnectionRegistry, Connector, DbConnection, PoolStats, PreparedStatement};
use crate::results::{ExecMeta, ResultSet};
use crate::types::SqlValue;

type FailFn = Arc<dyn Fn(&str, &[SqlValue]) -> bool + Send + Sync>;

crate::record! {
    /// Fixture record mapped to `<schema>.book`.
    #[derive(Debug, Clone, PartialEq, Default)]
    pub struct Book {
        #[pk]
        pub book_id: i64,
        pub title: String,
        pub author: String,
        pub created_by: String,
    }
}

#[must_use]
pub fn sample_book() -> Book {
    Book {
        book_id: 0,
        title: "The Martian".to_string(),
        author: "Andy Weir".to_string(),
        created_by: "papergres".to_string(),
    }
}

/// Settings for a database that is never actually contacted.
#[must_use]
pub fn mock_settings() -> ConnectionSettings {
    ConnectionSettings {
        database: Some("paperchain".to_string()),
        user: Some("paper".to_string()),
        password: Some("secret".to_string()),
        host: Some("localhost".to_string()),
        port: Some(5432),
        app_name: Some("papergres-tests".to_string()),
        ..ConnectionSettings::default()
    }
}

/// A [`Database`] whose registry always hands out `conn`.
#[must_use]
pub fn mock_database(conn: MockConnection) -> (Database, Arc<MockConnection>) {
    let conn = Arc::new(conn);
    let registry = ConnectionRegistry::new(Arc::new(FixedConnector(Arc::clone(&conn))));
    (
        Database::with_registry(mock_settings(), Arc::new(registry)),
        conn,
    )
}

#[derive(Clone)]
struct Behavior {
    fail_on: Option<FailFn>,
    fail_prepare: bool,
    fail_ping: bool,
    delay: Option<Duration>,
    capacity: usize,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            fail_on: None,
            fail_prepare: false,
            fail_ping: false,
            delay: None,
            capacity: 4,
        }
    }
}

struct State {
    executed: AtomicUsize,
    prepared: AtomicUsize,
    live_prepared: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    row_count: AtomicUsize,
    next_id: AtomicI64,
    closed: AtomicBool,
    last: Mutex<Option<(String, Vec<SqlValue>)>>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            executed: AtomicUsize::new(0),
            prepared: AtomicUsize::new(0),
            live_prepared: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            row_count: AtomicUsize::new(1),
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
            last: Mutex::new(None),
        }
    }
}

struct InFlight<'a>(&'a State);

impl<'a> InFlight<'a> {
    fn enter(state: &'a State) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Configurable fake connection with execution counters.
#[derive(Default)]
pub struct MockConnection {
    behavior: Behavior,
    state: Arc<State>,
}

impl MockConnection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every execution for which `predicate(sql, args)` holds.
    #[must_use]
    pub fn fail_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &[SqlValue]) -> bool + Send + Sync + 'static,
    {
        self.behavior.fail_on = Some(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn fail_prepare(mut self) -> Self {
        self.behavior.fail_prepare = true;
        self
    }

    #[must_use]
    pub fn fail_ping(mut self) -> Self {
        self.behavior.fail_ping = true;
        self
    }

    /// Sleep this long inside every execution.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.behavior.delay = Some(delay);
        self
    }

    /// Pool capacity reported through `stats`.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.behavior.capacity = capacity;
        self
    }

    fn from_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            state: Arc::default(),
        }
    }

    /// Rows returned by non-insert queries.
    pub fn set_row_count(&self, rows: usize) {
        self.state.row_count.store(rows, Ordering::SeqCst);
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.state.executed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn prepared(&self) -> usize {
        self.state.prepared.load(Ordering::SeqCst)
    }

    /// Prepared handles not yet dropped.
    #[must_use]
    pub fn live_prepared(&self) -> usize {
        self.state.live_prepared.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn last_sql(&self) -> Option<String> {
        self.last().map(|(sql, _)| sql)
    }

    #[must_use]
    pub fn last_args(&self) -> Option<Vec<SqlValue>> {
        self.last().map(|(_, args)| args)
    }

    fn last(&self) -> Option<(String, Vec<SqlValue>)> {
        self.state
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn run(
    behavior: &Behavior,
    state: &State,
    sql: &str,
    args: &[SqlValue],
) -> Result<ResultSet, PapergresError> {
    let _in_flight = InFlight::enter(state);
    if let Some(delay) = behavior.delay {
        tokio::time::sleep(delay).await;
    }
    state.executed.fetch_add(1, Ordering::SeqCst);
    *state.last.lock().unwrap_or_else(PoisonError::into_inner) =
        Some((sql.to_string(), args.to_vec()));

    if let Some(fail_on) = &behavior.fail_on
        && fail_on(sql, args)
    {
        return Err(PapergresError::ExecutionError(format!(
            "mock failure with {}",
            describe(args)
        )));
    }

    let mut rows = ResultSet::default();
    if sql.trim_start().to_ascii_uppercase().starts_with("INSERT") {
        rows.set_column_names(Arc::new(vec!["lastinsertid".to_string()]));
        let id = state.next_id.fetch_add(1, Ordering::SeqCst);
        rows.add_row_values(vec![SqlValue::Int(id)]);
    } else {
        let names = (0..args.len()).map(|i| format!("arg{i}")).collect();
        rows.set_column_names(Arc::new(names));
        for _ in 0..state.row_count.load(Ordering::SeqCst) {
            rows.add_row_values(args.to_vec());
        }
    }
    Ok(rows)
}

fn describe(args: &[SqlValue]) -> String {
    args.iter()
        .enumerate()
        .map(|(i, arg)| format!("arg{i}={arg}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn exactly_one(rows: ResultSet) -> Result<ResultSet, PapergresError> {
    if rows.len() == 1 {
        Ok(rows)
    } else {
        Err(PapergresError::NoRowsOrTooMany(rows.len()))
    }
}

fn non_query_meta() -> ExecMeta {
    ExecMeta {
        last_insert_id: None,
        rows_affected: Some(1),
    }
}

#[async_trait]
impl DbConnection for MockConnection {
    async fn execute_non_query(
        &self,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<ExecMeta, PapergresError> {
        run(&self.behavior, &self.state, sql, args).await?;
        Ok(non_query_meta())
    }

    async fn query_one(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        exactly_one(run(&self.behavior, &self.state, sql, args).await?)
    }

    async fn query_many(&self, sql: &str, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        run(&self.behavior, &self.state, sql, args).await
    }

    async fn prepare(&self, sql: &str) -> Result<Arc<dyn PreparedStatement>, PapergresError> {
        if self.behavior.fail_prepare {
            return Err(PapergresError::ExecutionError(format!(
                "mock prepare failure: {sql}"
            )));
        }
        self.state.prepared.fetch_add(1, Ordering::SeqCst);
        self.state.live_prepared.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockPrepared {
            sql: sql.to_string(),
            behavior: self.behavior.clone(),
            state: Arc::clone(&self.state),
        }))
    }

    async fn ping(&self) -> Result<(), PapergresError> {
        if self.behavior.fail_ping {
            Err(PapergresError::ConnectionError(
                "mock database does not exist".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            max_size: self.behavior.capacity,
            size: self.state.in_flight.load(Ordering::SeqCst),
            available: 0,
            waiting: 0,
        }
    }

    fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

struct MockPrepared {
    sql: String,
    behavior: Behavior,
    state: Arc<State>,
}

impl Drop for MockPrepared {
    fn drop(&mut self) {
        self.state.live_prepared.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PreparedStatement for MockPrepared {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn execute_non_query(&self, args: &[SqlValue]) -> Result<ExecMeta, PapergresError> {
        run(&self.behavior, &self.state, &self.sql, args).await?;
        Ok(non_query_meta())
    }

    async fn query_one(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        exactly_one(run(&self.behavior, &self.state, &self.sql, args).await?)
    }

    async fn query_many(&self, args: &[SqlValue]) -> Result<ResultSet, PapergresError> {
        run(&self.behavior, &self.state, &self.sql, args).await
    }
}

struct FixedConnector(Arc<MockConnection>);

impl Connector for FixedConnector {
    fn connect(
        &self,
        _settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DbConnection>, PapergresError> {
        Ok(Arc::clone(&self.0) as Arc<dyn DbConnection>)
    }
}

/// Connector that builds a fresh [`MockConnection`] per key and counts creations.
#[derive(Default)]
pub struct MockConnector {
    template: Behavior,
    connections: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnector {
    /// New connections copy `template`'s behavior.
    #[must_use]
    pub fn with_template(template: MockConnection) -> Self {
        Self {
            template: template.behavior,
            connections: Mutex::default(),
        }
    }

    fn connections(&self) -> std::sync::MutexGuard<'_, Vec<Arc<MockConnection>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.connections().len()
    }

    /// Connections closed by their registry.
    #[must_use]
    pub fn closed(&self) -> usize {
        self.connections().iter().filter(|c| c.is_closed()).count()
    }

    #[must_use]
    pub fn last_connection(&self) -> Option<Arc<MockConnection>> {
        self.connections().last().cloned()
    }
}

impl Connector for MockConnector {
    fn connect(
        &self,
        _settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DbConnection>, PapergresError> {
        let conn = Arc::new(MockConnection::from_behavior(self.template.clone()));
        self.connections().push(Arc::clone(&conn));
        Ok(conn)
    }
}
