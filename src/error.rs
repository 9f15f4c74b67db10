use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PapergresError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error(transparent)]
    PoolError(#[from] deadpool_postgres::PoolError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// Preparing the statement for a repeated query failed; no iteration ran.
    #[error("Prepare failed: {0}")]
    PrepareFailed(String),

    /// An iteration of a repeated query could not produce a result.
    #[error("Iteration {index} failed: {message}")]
    IterationFailed { index: usize, message: String },

    #[error("Invalid record shape: {0}")]
    InvalidRecordShape(String),

    #[error("Empty batch: at least one record is required")]
    EmptyBatch,

    /// The driver did not supply a generated id or an affected-row count.
    #[error("{0}")]
    MissingMetadata(String),

    #[error("Expected exactly one row, got {0}")]
    NoRowsOrTooMany(usize),

    #[error("Row decode error: {0}")]
    DecodeError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error(transparent)]
    Merged(#[from] MergedErrors),
}

/// Error messages collected from every failed iteration of a repeated query.
///
/// Displays as one message per line, in iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedErrors {
    messages: Vec<String>,
}

impl MergedErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: &PapergresError) {
        let message = err.to_string();
        let message = message.trim_end_matches('\n');
        if !message.is_empty() {
            self.messages.push(message.to_string());
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// `None` when nothing failed.
    #[must_use]
    pub fn into_error(self) -> Option<PapergresError> {
        if self.is_empty() {
            None
        } else {
            Some(PapergresError::Merged(self))
        }
    }
}

impl fmt::Display for MergedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages.join("\n"))
    }
}

impl std::error::Error for MergedErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_errors_join_one_per_line() {
        let mut merged = MergedErrors::new();
        merged.push(&PapergresError::ExecutionError("first".into()));
        merged.push(&PapergresError::EmptyBatch);
        let err = merged.into_error().unwrap();
        assert_eq!(
            err.to_string(),
            "SQL execution error: first\nEmpty batch: at least one record is required"
        );
    }

    #[test]
    fn empty_merge_is_no_error() {
        assert!(MergedErrors::new().into_error().is_none());
    }

    #[test]
    fn trailing_newlines_are_trimmed() {
        let mut merged = MergedErrors::new();
        merged.push(&PapergresError::ExecutionError("boom\n".into()));
        assert_eq!(merged.messages(), ["SQL execution error: boom"]);
    }
}
