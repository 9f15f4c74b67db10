use crate::pool::{DbConnection, PreparedStatement};

/// What a statement runs against: a pooled connection, or a statement
/// prepared on one.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    Connection(&'a dyn DbConnection),
    Prepared(&'a dyn PreparedStatement),
}

impl<'a> From<&'a dyn DbConnection> for Target<'a> {
    fn from(conn: &'a dyn DbConnection) -> Self {
        Target::Connection(conn)
    }
}

impl<'a> From<&'a dyn PreparedStatement> for Target<'a> {
    fn from(stmt: &'a dyn PreparedStatement) -> Self {
        Target::Prepared(stmt)
    }
}
