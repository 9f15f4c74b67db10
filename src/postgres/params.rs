use std::error::Error;

use chrono::NaiveDateTime;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::PapergresError;
use crate::types::SqlValue;

/// Borrowed Postgres parameters for one execution.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert a slice of `SqlValue`s to Postgres parameters.
    ///
    /// # Errors
    /// Returns `PapergresError::ParameterError` for a `List`, which has no wire form.
    pub fn convert(params: &'a [SqlValue]) -> Result<Params<'a>, PapergresError> {
        let mut references = Vec::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            if matches!(p, SqlValue::List(_)) {
                return Err(PapergresError::ParameterError(format!(
                    "argument ${} is a list; lists are only expanded by exec_all_in",
                    i + 1
                )));
            }
            references.push(p as &(dyn ToSql + Sync));
        }
        Ok(Params { references })
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

impl ToSql for SqlValue {
    #[allow(clippy::cast_possible_truncation)]
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            SqlValue::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                _ => (*i).to_sql(ty, out),
            },
            SqlValue::Float(f) => match *ty {
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                _ => (*f).to_sql(ty, out),
            },
            SqlValue::Text(s) => s.to_sql(ty, out),
            SqlValue::Bool(b) => (*b).to_sql(ty, out),
            SqlValue::Timestamp(dt) => timestamp_to_sql(dt, ty, out),
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::JSON(jsval) => jsval.to_sql(ty, out),
            SqlValue::Blob(bytes) => bytes.to_sql(ty, out),
            SqlValue::List(_) => Err("list values cannot be bound as a single parameter".into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

fn timestamp_to_sql(
    dt: &NaiveDateTime,
    ty: &Type,
    out: &mut bytes::BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if *ty == Type::TIMESTAMPTZ {
        dt.and_utc().to_sql(ty, out)
    } else {
        dt.to_sql(ty, out)
    }
}
