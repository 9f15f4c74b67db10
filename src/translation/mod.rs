//! Placeholder rewriting for `IN (...)` style queries.
//!
//! Queries passed to [`Query::exec_all_in`](crate::Query::exec_all_in) bind
//! arguments to bare `?` markers. A `SqlValue::List` argument expands to one
//! placeholder per element, and every placeholder is then renumbered to
//! Postgres `$n` form. Markers inside quoted strings, comments and
//! dollar-quoted blocks are left alone; `??` is emitted as a literal `?`.

mod parsers;
mod scanner;

use parsers::{
    closes_block_comment, closes_dollar_quote, dollar_quote_tag, opens_block_comment,
    opens_line_comment,
};
use scanner::Region;

use crate::error::PapergresError;
use crate::types::SqlValue;

/// SQL with `$n` placeholders plus the flattened arguments they bind.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedQuery {
    pub sql: String,
    pub args: Vec<SqlValue>,
}

/// Expand list arguments bound to `?` and renumber placeholders as `$1..$n`.
///
/// ```rust
/// use papergres::prelude::*;
/// use papergres::translation::expand_in;
///
/// let expanded = expand_in(
///     "SELECT * FROM paper.book WHERE author = ? AND book_id IN (?)",
///     &[
///         SqlValue::from("Andy Weir"),
///         SqlValue::List(vec![SqlValue::Int(1), SqlValue::Int(2)]),
///     ],
/// )?;
/// assert_eq!(
///     expanded.sql,
///     "SELECT * FROM paper.book WHERE author = $1 AND book_id IN ($2, $3)"
/// );
/// assert_eq!(expanded.args.len(), 3);
/// # Ok::<(), PapergresError>(())
/// ```
///
/// # Errors
/// Returns `PapergresError::ParameterError` when the number of `?` markers
/// differs from the number of arguments or a list argument is empty.
pub fn expand_in(sql: &str, args: &[SqlValue]) -> Result<ExpandedQuery, PapergresError> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + args.len() * 4);
    let mut flat: Vec<SqlValue> = Vec::with_capacity(args.len());
    let mut pending = args.iter();
    let mut markers = 0usize;
    let mut copied = 0usize;
    let mut state = Region::Code;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            Region::Code => match b {
                b'\'' => state = Region::Literal,
                b'"' => state = Region::Identifier,
                _ if opens_line_comment(bytes, idx) => state = Region::LineComment,
                _ if opens_block_comment(bytes, idx) => {
                    state = Region::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, advance)) = dollar_quote_tag(bytes, idx) {
                        state = Region::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'?' if bytes.get(idx + 1) == Some(&b'?') => {
                    out.push_str(&sql[copied..=idx]);
                    idx += 1;
                    copied = idx + 1;
                }
                b'?' => {
                    out.push_str(&sql[copied..idx]);
                    copied = idx + 1;
                    markers += 1;
                    match pending.next() {
                        Some(arg) => bind(arg, markers, &mut out, &mut flat)?,
                        None => {
                            return Err(PapergresError::ParameterError(format!(
                                "query has more ? placeholders than the {} arguments supplied",
                                args.len()
                            )));
                        }
                    }
                }
                _ => {}
            },
            Region::Literal => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // escaped quote
                    } else {
                        state = Region::Code;
                    }
                }
            }
            Region::Identifier => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = Region::Code;
                    }
                }
            }
            Region::LineComment => {
                if b == b'\n' {
                    state = Region::Code;
                }
            }
            Region::BlockComment(depth) => {
                if opens_block_comment(bytes, idx) {
                    state = Region::BlockComment(depth + 1);
                    idx += 1;
                } else if closes_block_comment(bytes, idx) {
                    state = Region::leave_block_comment(depth);
                    idx += 1;
                }
            }
            Region::DollarQuoted(ref tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = Region::Code;
                }
            }
        }
        idx += 1;
    }

    if pending.next().is_some() {
        return Err(PapergresError::ParameterError(format!(
            "query has {markers} ? placeholders but {} arguments were supplied",
            args.len()
        )));
    }

    out.push_str(&sql[copied..]);
    Ok(ExpandedQuery { sql: out, args: flat })
}

fn bind(
    arg: &SqlValue,
    marker: usize,
    out: &mut String,
    flat: &mut Vec<SqlValue>,
) -> Result<(), PapergresError> {
    match arg {
        SqlValue::List(items) if items.is_empty() => Err(PapergresError::ParameterError(
            format!("empty list bound to placeholder {marker}"),
        )),
        SqlValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if matches!(item, SqlValue::List(_)) {
                    return Err(PapergresError::ParameterError(format!(
                        "nested list bound to placeholder {marker}"
                    )));
                }
                if i > 0 {
                    out.push_str(", ");
                }
                flat.push(item.clone());
                out.push('$');
                out.push_str(&flat.len().to_string());
            }
            Ok(())
        }
        other => {
            flat.push(other.clone());
            out.push('$');
            out.push_str(&flat.len().to_string());
            Ok(())
        }
    }
}
