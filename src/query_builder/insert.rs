use crate::error::PapergresError;
use crate::record::{self, Field, Record};
use crate::types::SqlValue;

/// INSERT statement text together with its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

/// Build the INSERT statement and argument list for `record` in `schema`.
///
/// The primary-key column is left out unless `with_pk` is set; it is always
/// named in the `RETURNING` clause. Column, placeholder and argument order all
/// follow the record's field order.
///
/// # Errors
/// Returns `PapergresError::InvalidRecordShape` if the record has no fields,
/// more than one primary field, no primary field, or nothing left to insert.
pub fn build_insert<R: Record>(
    record: &R,
    schema: &str,
    with_pk: bool,
) -> Result<InsertStatement, PapergresError> {
    let (columns, primary) = prepare_fields(record, with_pk)?;

    let table = format!("{schema}.{}", R::table_name());
    let names: Vec<_> = columns.iter().map(Field::column_name).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();

    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({}) RETURNING {} as LastInsertId;",
        names.join(", "),
        placeholders.join(","),
        primary.column_name()
    );
    let args = columns.into_iter().map(|f| f.value).collect();

    Ok(InsertStatement { sql, args })
}

/// SQL text half of [`build_insert`].
///
/// # Errors
/// See [`build_insert`].
pub fn insert_sql<R: Record>(
    record: &R,
    schema: &str,
    with_pk: bool,
) -> Result<String, PapergresError> {
    build_insert(record, schema, with_pk).map(|stmt| stmt.sql)
}

/// Argument half of [`build_insert`].
///
/// # Errors
/// See [`build_insert`].
pub fn insert_args<R: Record>(record: &R, with_pk: bool) -> Result<Vec<SqlValue>, PapergresError> {
    let (columns, _) = prepare_fields(record, with_pk)?;
    Ok(columns.into_iter().map(|f| f.value).collect())
}

/// Split a record into the fields to insert and its primary field.
fn prepare_fields<R: Record>(
    record: &R,
    with_pk: bool,
) -> Result<(Vec<Field>, Field), PapergresError> {
    let mut primary = None;
    let mut columns = Vec::new();
    for field in record::fields(record)? {
        if field.is_primary {
            primary = Some(field.clone());
            if !with_pk {
                continue;
            }
        }
        columns.push(field);
    }

    let primary = primary.ok_or_else(|| {
        PapergresError::InvalidRecordShape(format!(
            "{} has no primary field to return",
            R::TYPE_NAME
        ))
    })?;
    if columns.is_empty() {
        return Err(PapergresError::InvalidRecordShape(format!(
            "{} has no columns to insert",
            R::TYPE_NAME
        )));
    }
    Ok((columns, primary))
}
