use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::PapergresError;

/// Values that can be bound as query arguments or read back from a row.
///
/// ```rust
/// use papergres::prelude::*;
///
/// let args = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::from(true),
/// ];
/// # let _ = args;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// A list bound to a single `?` in [`Query::exec_all_in`](crate::Query::exec_all_in).
    /// Lists cannot be sent to the server directly.
    List(Vec<SqlValue>),
}

impl SqlValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(value) => Some(*value),
            SqlValue::Int(1) => Some(true),
            SqlValue::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let SqlValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Timestamp(v) => write!(f, "{v}"),
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::JSON(v) => write!(f, "{v}"),
            SqlValue::Blob(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! sql_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )*
    };
}

sql_value_from!(
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u32 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
);

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value.naive_utc())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<PrimaryKey> for SqlValue {
    fn from(value: PrimaryKey) -> Self {
        match value {
            PrimaryKey::Int(id) => SqlValue::Int(id),
            PrimaryKey::Text(id) => SqlValue::Text(id),
        }
    }
}

/// Primary key kinds a generated id can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimaryKey {
    Int(i64),
    Text(String),
}

impl PrimaryKey {
    /// Interpret a returned column value as a key. NULL yields `None`.
    #[must_use]
    pub fn from_value(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Int(id) => Some(PrimaryKey::Int(*id)),
            SqlValue::Text(id) => Some(PrimaryKey::Text(id.clone())),
            SqlValue::Null => None,
            other => Some(PrimaryKey::Text(other.to_string())),
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PrimaryKey::Int(id) => Some(*id),
            PrimaryKey::Text(_) => None,
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKey::Int(id) => write!(f, "{id}"),
            PrimaryKey::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        PrimaryKey::Int(value)
    }
}

impl From<i32> for PrimaryKey {
    fn from(value: i32) -> Self {
        PrimaryKey::Int(value.into())
    }
}

impl From<String> for PrimaryKey {
    fn from(value: String) -> Self {
        PrimaryKey::Text(value)
    }
}

impl From<&str> for PrimaryKey {
    fn from(value: &str) -> Self {
        PrimaryKey::Text(value.to_string())
    }
}

/// Conversion from a column value into a Rust field type.
pub trait FromSqlValue: Sized {
    /// # Errors
    /// Returns `PapergresError::DecodeError` when the value has an incompatible kind.
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError>;
}

fn mismatch(expected: &str, value: &SqlValue) -> PapergresError {
    PapergresError::DecodeError(format!("expected {expected}, found {value:?}"))
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        Ok(value.clone())
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value.as_int().copied().ok_or_else(|| mismatch("integer", value))
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        let wide = i64::from_sql_value(value)?;
        i32::try_from(wide).map_err(|e| PapergresError::DecodeError(format!("{wide}: {e}")))
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value.as_float().ok_or_else(|| mismatch("float", value))
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value.as_bool().ok_or_else(|| mismatch("bool", value))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value
            .as_text()
            .map(ToString::to_string)
            .ok_or_else(|| mismatch("text", value))
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value.as_timestamp().ok_or_else(|| mismatch("timestamp", value))
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        NaiveDateTime::from_sql_value(value).map(|dt| dt.and_utc())
    }
}

impl FromSqlValue for JsonValue {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        match value {
            SqlValue::JSON(json) => Ok(json.clone()),
            other => Err(mismatch("json", other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        value
            .as_blob()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| mismatch("blob", value))
    }
}

impl FromSqlValue for PrimaryKey {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        PrimaryKey::from_value(value).ok_or_else(|| mismatch("primary key", value))
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: &SqlValue) -> Result<Self, PapergresError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_sql_value(value).map(Some)
        }
    }
}

/// Build an argument list from heterogeneous values.
///
/// ```rust
/// let args = papergres::args![42, "current", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::SqlValue>::new() };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::SqlValue::from($value)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn zero_is_a_valid_primary_key() {
        assert_eq!(
            PrimaryKey::from_value(&SqlValue::Int(0)),
            Some(PrimaryKey::Int(0))
        );
        assert_eq!(PrimaryKey::from_value(&SqlValue::Null), None);
    }

    #[test]
    fn decodes_optional_and_required_values() {
        assert_eq!(Option::<i64>::from_sql_value(&SqlValue::Null).unwrap(), None);
        assert_eq!(i32::from_sql_value(&SqlValue::Int(7)).unwrap(), 7);
        assert!(String::from_sql_value(&SqlValue::Int(7)).is_err());
        assert!(i32::from_sql_value(&SqlValue::Int(i64::MAX)).is_err());
    }

    #[test]
    fn timestamps_parse_from_text() {
        let v = SqlValue::Text("2024-03-01 10:11:12.250".into());
        assert!(v.as_timestamp().is_some());
    }

    #[test]
    fn args_macro_converts_each_value() {
        let args = crate::args![1, "two", 3.5, None::<bool>];
        assert_eq!(
            args,
            vec![
                SqlValue::Int(1),
                SqlValue::Text("two".into()),
                SqlValue::Float(3.5),
                SqlValue::Null
            ]
        );
    }

    #[test]
    fn list_display() {
        let v = SqlValue::List(vec![SqlValue::Int(1), SqlValue::Text("a".into())]);
        assert_eq!(v.to_string(), "[1, a]");
    }
}
