use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::info;

use super::DbConnection;
use crate::config::ConnectionSettings;
use crate::error::PapergresError;
use crate::postgres::PostgresConnector;

/// Builds a connection for settings that have no cached entry yet.
///
/// Creation is synchronous: pools connect lazily on first checkout, so the
/// registry can hold its lock while a connection is built.
pub trait Connector: Send + Sync {
    /// # Errors
    /// Returns an error if the settings cannot produce a connection.
    fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DbConnection>, PapergresError>;
}

#[derive(Default)]
struct Entries {
    connections: HashMap<String, Arc<dyn DbConnection>>,
    shut_down: bool,
}

/// Open connections keyed by rendered connection string.
///
/// At most one connection exists per key; concurrent first requests for the
/// same key observe the same instance.
pub struct ConnectionRegistry {
    connector: Arc<dyn Connector>,
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.len())
            .finish_non_exhaustive()
    }
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// A registry that opens Postgres pools.
    #[must_use]
    pub fn postgres() -> Self {
        Self::new(Arc::new(PostgresConnector))
    }

    /// Process-wide Postgres registry used when no registry is supplied.
    #[must_use]
    pub fn shared() -> Arc<ConnectionRegistry> {
        static SHARED: OnceLock<Arc<ConnectionRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ConnectionRegistry::postgres())))
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Return the cached connection for `settings`, creating it if absent.
    ///
    /// # Errors
    /// Returns `PapergresError::ConnectionError` after [`shutdown`](Self::shutdown),
    /// or the connector's error when creation fails. Failed creations are not cached.
    pub fn get(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DbConnection>, PapergresError> {
        let key = settings.connection_string();
        let mut entries = self.lock();
        if entries.shut_down {
            return Err(PapergresError::ConnectionError(
                "connection registry has been shut down".to_string(),
            ));
        }
        if let Some(conn) = entries.connections.get(&key) {
            return Ok(Arc::clone(conn));
        }
        let conn = self.connector.connect(settings)?;
        info!(
            target: "papergres::registry",
            connection = %settings.prettify_connection_string(),
            "opened connection"
        );
        entries.connections.insert(key, Arc::clone(&conn));
        Ok(conn)
    }

    /// Close and forget every cached connection. Later `get` calls open new ones.
    pub fn reset(&self) {
        let drained = std::mem::take(&mut self.lock().connections);
        close_all(drained);
    }

    /// Close every cached connection and refuse further `get` calls.
    pub fn shutdown(&self) {
        let drained = {
            let mut entries = self.lock();
            entries.shut_down = true;
            std::mem::take(&mut entries.connections)
        };
        close_all(drained);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn close_all(connections: HashMap<String, Arc<dyn DbConnection>>) {
    let count = connections.len();
    for conn in connections.into_values() {
        conn.close();
    }
    if count > 0 {
        info!(target: "papergres::registry", closed = count, "closed connections");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mock::MockConnector;

    fn settings(db: &str) -> ConnectionSettings {
        ConnectionSettings {
            database: Some(db.to_string()),
            host: Some("localhost".to_string()),
            port: Some(5432),
            user: Some("paper".to_string()),
            ..ConnectionSettings::default()
        }
    }

    #[test]
    fn creates_once_per_key() {
        let connector = Arc::new(MockConnector::default());
        let registry = ConnectionRegistry::new(connector.clone());
        let a = registry.get(&settings("one")).unwrap();
        let b = registry.get(&settings("one")).unwrap();
        let _c = registry.get(&settings("two")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connects(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_first_requests_share_one_instance() {
        let connector = Arc::new(MockConnector::default());
        let registry = Arc::new(ConnectionRegistry::new(connector.clone()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get(&settings("race")).unwrap())
            })
            .collect();
        let conns: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(conns.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(connector.connects(), 1);
    }

    #[test]
    fn reset_closes_and_recreates() {
        let connector = Arc::new(MockConnector::default());
        let registry = ConnectionRegistry::new(connector.clone());
        let first = registry.get(&settings("one")).unwrap();
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(connector.closed(), 1);
        let second = registry.get(&settings("one")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connects(), 2);
    }

    #[test]
    fn shutdown_refuses_new_connections() {
        let connector = Arc::new(MockConnector::default());
        let registry = ConnectionRegistry::new(connector.clone());
        registry.get(&settings("one")).unwrap();
        registry.shutdown();
        assert_eq!(connector.closed(), 1);
        assert!(matches!(
            registry.get(&settings("one")),
            Err(PapergresError::ConnectionError(_))
        ));
    }
}
