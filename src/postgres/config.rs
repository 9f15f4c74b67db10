use std::sync::Arc;

use tokio_postgres::NoTls;

use super::PgConnection;
use crate::config::ConnectionSettings;
use crate::error::PapergresError;
use crate::pool::{Connector, DbConnection};

impl PgConnection {
    /// Build a pooled Postgres connection from settings.
    ///
    /// No connection is opened until the first query checks one out.
    ///
    /// # Errors
    /// Returns `PapergresError::ConfigError` if required settings are missing or
    /// `PapergresError::ConnectionError` if pool creation fails.
    pub fn from_settings(settings: &ConnectionSettings) -> Result<Self, PapergresError> {
        let pg_config = settings.to_pool_config()?;
        let pool = pg_config
            .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
            .map_err(|e| {
                PapergresError::ConnectionError(format!("Failed to create Postgres pool: {e}"))
            })?;
        Ok(PgConnection::new(pool))
    }
}

/// Opens [`PgConnection`]s for a [`ConnectionRegistry`](crate::pool::ConnectionRegistry).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl Connector for PostgresConnector {
    fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Arc<dyn DbConnection>, PapergresError> {
        Ok(Arc::new(PgConnection::from_settings(settings)?))
    }
}
