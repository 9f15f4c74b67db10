use postgresql_embedded::PostgreSQL;

use super::super::SHARED_RUNTIME;
use crate::config::ConnectionSettings;
use crate::pool::DbConnection;
use crate::postgres::PgConnection;

/// Represents a running embedded `PostgreSQL` instance.
pub struct EmbeddedPostgres {
    pub postgresql: PostgreSQL,
    pub port: u16,
    pub database_url: String,
    /// Working settings with the server's credentials and port
    pub settings: ConnectionSettings,
}

/// Start an embedded `PostgreSQL` server and create `db_name` on it.
///
/// Call from outside any tokio runtime; the work runs on a shared runtime.
///
/// # Errors
/// Returns an error if the embedded server cannot be set up, started, or if
/// database provisioning or the post-start connectivity check fails.
pub fn setup_postgres_embedded(
    db_name: &str,
) -> Result<EmbeddedPostgres, Box<dyn std::error::Error>> {
    SHARED_RUNTIME.block_on(async {
        let mut postgresql = PostgreSQL::default();

        // bundled binaries, so no download
        postgresql.setup().await?;
        postgresql.start().await?;

        let port = postgresql.settings().port;
        let host = postgresql.settings().host.clone();
        let user = postgresql.settings().username.clone();
        let password = postgresql.settings().password.clone();

        postgresql.create_database(db_name).await?;

        let database_url = format!("postgres://{user}:{password}@{host}:{port}/{db_name}");
        let settings = ConnectionSettings::from_url(&database_url, "papergres-tests")?;

        // Quick connection test on a throwaway pool bound to this runtime
        let probe = PgConnection::from_settings(&settings)?;
        probe.ping().await?;
        probe.close();

        Ok(EmbeddedPostgres {
            postgresql,
            port,
            database_url,
            settings,
        })
    })
}

/// Stop a previously started embedded `PostgreSQL` instance.
pub fn stop_postgres_embedded(postgres: EmbeddedPostgres) {
    let EmbeddedPostgres { postgresql, .. } = postgres;
    SHARED_RUNTIME.block_on(async move {
        let _ = postgresql.stop().await;
    });
}
