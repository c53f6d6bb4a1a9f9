//! Packaging Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A packaging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested format is not supported.
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// The directory to package doesn't exist or isn't a directory.
    #[display("not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    /// Adding an entry to the archive failed.
    #[display("could not archive: {}", _0.display())]
    Entry(#[error(not(source))] PathBuf),
    /// An I/O operation failed while writing the payload.
    #[display("I/O error")]
    Io,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::UnsupportedFormat("lz4".to_string()).to_string(), "unsupported format: lz4");
        assert_eq!(ErrorKind::NotADirectory(PathBuf::from("/tmp/x")).to_string(), "not a directory: /tmp/x");
        assert_eq!(ErrorKind::Io.to_string(), "I/O error");
    }
}
