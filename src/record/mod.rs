//! Record descriptions used to derive INSERT statements.
//!
//! A record lists its fields in declaration order through [`Record::fields`].
//! Implement the trait by hand with [`Field`] builders, or let
//! [`record!`](crate::record!) generate it together with a [`FromRow`](crate::FromRow) impl.

mod macros;

use std::borrow::Cow;

use crate::error::PapergresError;
use crate::types::SqlValue;

/// One field of a record: its value plus the metadata that maps it to a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub type_label: &'static str,
    pub value: SqlValue,
    /// Explicit column name overriding the converted field name.
    pub tag: Option<&'static str>,
    pub is_primary: bool,
}

impl Field {
    pub fn new(name: &'static str, type_label: &'static str, value: impl Into<SqlValue>) -> Self {
        Self {
            name,
            type_label,
            value: value.into(),
            tag: None,
            is_primary: false,
        }
    }

    #[must_use]
    pub fn column(mut self, column: &'static str) -> Self {
        self.tag = Some(column);
        self
    }

    #[must_use]
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    /// Apply a `#[pk]` or `#[column = "..."]` marker; anything else is ignored.
    #[doc(hidden)]
    #[must_use]
    pub fn with_attr(self, attr: &str, value: &'static str) -> Self {
        match attr {
            "pk" | "primary" => self.primary(),
            "column" if !value.is_empty() => self.column(value),
            _ => self,
        }
    }

    /// The tag if present, else the snake_case form of the field name.
    #[must_use]
    pub fn column_name(&self) -> Cow<'static, str> {
        match self.tag {
            Some(tag) if !tag.is_empty() => Cow::Borrowed(tag),
            _ => Cow::Owned(to_sql_name(self.name)),
        }
    }
}

/// A structured value whose fields map to the columns of one table row.
pub trait Record {
    /// Type name the table name is derived from, e.g. `TransactionSource`.
    const TYPE_NAME: &'static str;

    /// Fields in declaration order.
    fn fields(&self) -> Vec<Field>;

    /// `TYPE_NAME` converted with [`to_sql_name`].
    fn table_name() -> String {
        to_sql_name(Self::TYPE_NAME)
    }
}

/// Introspect a record, rejecting shapes an INSERT cannot be built from.
///
/// # Errors
/// Returns `PapergresError::InvalidRecordShape` when the record has no fields
/// or marks more than one field as primary.
pub fn fields<R: Record>(record: &R) -> Result<Vec<Field>, PapergresError> {
    let fields = record.fields();
    if fields.is_empty() {
        return Err(PapergresError::InvalidRecordShape(format!(
            "{} declares no fields",
            R::TYPE_NAME
        )));
    }
    let primaries = fields.iter().filter(|f| f.is_primary).count();
    if primaries > 1 {
        return Err(PapergresError::InvalidRecordShape(format!(
            "{} marks {primaries} fields as primary; at most one is allowed",
            R::TYPE_NAME
        )));
    }
    Ok(fields)
}

/// Convert a mixed-case name to lower case with underscores.
///
/// Every upper-case letter after the first character starts a new segment:
/// `TransactionSource` becomes `transaction_source` and `ID` becomes `i_d`.
/// Input that is already lower case with underscores is returned unchanged.
#[must_use]
pub fn to_sql_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Column name for a macro-declared field, applying the same markers as [`Field::with_attr`].
#[doc(hidden)]
#[must_use]
pub fn column_for(name: &'static str, attrs: &[(&str, &'static str)]) -> Cow<'static, str> {
    let field = attrs
        .iter()
        .fold(Field::new(name, "", SqlValue::Null), |field, (attr, value)| {
            field.with_attr(attr, value)
        });
    field.column_name()
}
