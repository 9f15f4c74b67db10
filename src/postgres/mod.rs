// PostgreSQL backend
//
// - config: pool construction from `ConnectionSettings`
// - connection: `DbConnection` and `PreparedStatement` over deadpool
// - params: `SqlValue` to `ToSql` conversion
// - query: row extraction into `ResultSet`

pub mod config;
pub mod connection;
pub mod params;
pub mod query;

pub use config::PostgresConnector;
pub use connection::{PgConnection, PgPrepared};
pub use params::Params;
pub use query::{build_result_set_from_statement, postgres_extract_value};
