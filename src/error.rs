//! Error types for the CSV codec.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CsvError>;

/// Why a path was refused as a CSV target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// The path exists but is a directory or another non-file entry.
    NotAFile,
    /// The file name does not end in `.csv`.
    Extension,
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRejection::NotAFile => write!(f, "not a regular file"),
            PathRejection::Extension => write!(f, "extension is not .csv"),
        }
    }
}

/// Errors that can occur while reading, writing or binding CSV data.
#[derive(Error, Debug)]
pub enum CsvError {
    /// The path is not an acceptable CSV file; raised before any I/O
    #[error("{} is not a csv file: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: PathRejection },

    /// Failed to read, write, decode or encode the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A charset label that `encoding_rs` does not know
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// The row type cannot be built at all; aborts the whole conversion
    #[error("Cannot construct {type_name}: {message}")]
    Construction {
        type_name: &'static str,
        message: String,
    },

    /// A single row cannot be bound; the row is skipped
    #[error("Invalid row {row}: {message}")]
    RowBinding { row: usize, message: String },
}

impl CsvError {
    /// Builds a row binding error for the given field position.
    pub fn row(row: usize, message: impl Into<String>) -> Self {
        CsvError::RowBinding {
            row,
            message: message.into(),
        }
    }

    /// Returns `true` if the error only invalidates the current row.
    pub fn is_row_local(&self) -> bool {
        matches!(self, CsvError::RowBinding { .. })
    }
}
