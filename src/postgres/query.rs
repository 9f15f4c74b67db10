use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Row, Statement};

use crate::error::PapergresError;
use crate::results::ResultSet;
use crate::types::SqlValue;

/// Build a result set using statement metadata for column names, so an
/// empty result still carries its columns.
///
/// # Errors
/// Returns errors from row value extraction.
pub fn build_result_set_from_statement(
    stmt: &Statement,
    rows: &[Row],
) -> Result<ResultSet, PapergresError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let column_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(rows.len());
    result_set.set_column_names(Arc::new(column_names));

    for row in rows {
        let mut row_values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            row_values.push(postgres_extract_value(row, idx)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// Extracts a `SqlValue` from a `tokio_postgres` Row at the given index.
///
/// # Errors
/// Returns `PapergresError` if the column cannot be read as its declared type.
pub fn postgres_extract_value(row: &Row, idx: usize) -> Result<SqlValue, PapergresError> {
    let column = &row.columns()[idx];
    let value = match *column.type_() {
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Int(i64::from(v))),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)?
            .map_or(SqlValue::Null, SqlValue::Int),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Float(f64::from(v))),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)?
            .map_or(SqlValue::Null, SqlValue::Float),
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)?
            .map_or(SqlValue::Null, SqlValue::Bool),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map_or(SqlValue::Null, SqlValue::Timestamp),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map_or(SqlValue::Null, |v| SqlValue::Timestamp(v.naive_utc())),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<Value>>(idx)?
            .map_or(SqlValue::Null, SqlValue::JSON),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)?
            .map_or(SqlValue::Null, SqlValue::Blob),
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(|e| {
                PapergresError::DecodeError(format!(
                    "column {} has unsupported type {}: {e}",
                    column.name(),
                    column.type_()
                ))
            })?
            .map_or(SqlValue::Null, SqlValue::Text),
    };
    Ok(value)
}
