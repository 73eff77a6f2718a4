//! Error types for merge sources

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that make a source unusable
#[derive(Debug, Error)]
pub enum OpenError {
    /// IO error reading the source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// No driver handles this kind of file
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The content does not look like the expected format
    #[error("Not a {expected} source: {reason}")]
    WrongFormat {
        expected: &'static str,
        reason: String,
    },

    /// Duplicate column names in a header row
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Invalid delimiter
    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),
}

impl OpenError {
    pub(crate) fn from_csv(err: csv::Error, expected: &'static str) -> Self {
        if err.is_io_error() {
            if let csv::ErrorKind::Io(io) = err.into_kind() {
                return OpenError::Io(io);
            }
            return OpenError::WrongFormat {
                expected,
                reason: "unreadable input".to_string(),
            };
        }
        OpenError::WrongFormat {
            expected,
            reason: err.to_string(),
        }
    }
}

/// A single record that could not be read. Iteration continues after it.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("line {line} (record {record}): {reason}")]
pub struct ParseError {
    /// 1-based line where the record starts, or where the problem was found
    pub line: u64,
    /// 1-based position of the record in the source, counting bad records
    pub record: usize,
    /// What went wrong
    pub reason: String,
}

impl ParseError {
    pub(crate) fn new(line: u64, record: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            record,
            reason: reason.into(),
        }
    }
}

/// Result type for opening merge sources
pub type Result<T> = std::result::Result<T, OpenError>;

/// Result of reading one record
pub type RecordResult = std::result::Result<crate::record::Record, ParseError>;
