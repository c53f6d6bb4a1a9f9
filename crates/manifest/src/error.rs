//! Manifest Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A manifest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for manifest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Lookup Errors
/// - [`ErrorKind::Lookup`]
/// - [`ErrorKind::FolderNotFound`]
///
/// ### Transfer Errors
/// - [`ErrorKind::Transfer`]
///
/// ### Local Errors
/// - [`ErrorKind::InvalidPath`]
/// - [`ErrorKind::Io`]
/// - [`ErrorKind::Document`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Listing the children of a folder failed.
    #[display("lookup failed for folder: {_0}")]
    Lookup(#[error(not(source))] String),
    /// No folder with the requested name exists in the tree.
    #[display("folder not found: {_0}")]
    FolderNotFound(#[error(not(source))] String),
    /// Fetching the bytes of a file failed.
    #[display("transfer failed for file: {_0}")]
    Transfer(#[error(not(source))] String),
    /// Identifier resolves outside of the tree root.
    #[display("invalid path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Manifest document could not be written or parsed.
    #[display("manifest document error: {}", _0.display())]
    Document(#[error(not(source))] PathBuf),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
