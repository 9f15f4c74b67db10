//! Convenient imports for common functionality.

pub use crate::config::{ConnectionSettings, RepeatOptions, SslMode};
pub use crate::database::Database;
pub use crate::error::{MergedErrors, PapergresError};
pub use crate::executor::{Repeat, RepeatOutcome};
pub use crate::pool::{ConnectionRegistry, DbConnection, PreparedStatement};
pub use crate::query::Query;
pub use crate::record::{Field, Record};
pub use crate::results::{DbRow, FromRow, QueryResult, ResultSet};
pub use crate::schema::Schema;
pub use crate::types::{FromSqlValue, PrimaryKey, SqlValue};
pub use crate::{args, record};
