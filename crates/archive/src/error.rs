//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A filesystem operation on the given path failed.
    #[display("I/O error on {}: {_1}", _0.display())]
    Io(#[error(not(source))] PathBuf, #[error(source)] IoError),
    /// Something other than a directory occupies a path that must be one.
    #[display("not a directory: {}", _0.display())]
    NotADirectory(#[error(not(source))] PathBuf),
    /// The manifest document could not be read for metadata.
    #[display("unreadable manifest: {}", _0.display())]
    Manifest(#[error(not(source))] PathBuf),
    /// The metadata record could not be serialized or parsed.
    #[display("invalid metadata document: {}", _0.display())]
    Metadata(#[error(not(source))] PathBuf),
    /// A timestamp string isn't in `YYYY-MM-DD HH:MM` format.
    #[display("invalid timestamp: {_0}")]
    Timestamp(#[error(not(source))] String),
}
impl ErrorKind {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(IoError) -> Self {
        let path = path.into();
        move |err| Self::Io(path, err)
    }
}
