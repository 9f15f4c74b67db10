//! Test support: an in-memory connection and, with the `test-utils-postgres`
//! feature, an embedded Postgres server.

pub mod mock;

#[cfg(feature = "test-utils-postgres")]
pub mod postgres;

#[cfg(feature = "test-utils-postgres")]
use std::sync::LazyLock;
#[cfg(feature = "test-utils-postgres")]
use tokio::runtime::Runtime;

/// Shared tokio runtime for test utilities to avoid creating multiple runtimes
#[cfg(feature = "test-utils-postgres")]
pub(crate) static SHARED_RUNTIME: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new().expect("Failed to create tokio runtime for test utilities"));

#[cfg(feature = "test-utils-postgres")]
pub use postgres::*;
