//! SQL text generation from records.

mod insert;

pub use insert::{InsertStatement, build_insert, insert_args, insert_sql};
