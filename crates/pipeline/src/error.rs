//! Pipeline Error Types
//!
//! One variant per stage. Each carries the rendered message of the
//! collaborator error it wraps; the collaborator's own `Exn` frame is kept as
//! a child in the error tree.

use derive_more::{Display, Error};

/// A pipeline stage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline stages.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("snapshot failed: {_0}")]
    Snapshot(#[error(not(source))] String),
    #[display("fetch failed: {_0}")]
    Fetch(#[error(not(source))] String),
    #[display("packaging failed: {_0}")]
    Package(#[error(not(source))] String),
    #[display("bundling failed: {_0}")]
    Bundle(#[error(not(source))] String),
    #[display("cataloguing failed: {_0}")]
    Catalog(#[error(not(source))] String),
    #[display("upload failed: {_0}")]
    Upload(#[error(not(source))] String),
}

/// Raise a collaborator's error into a stage error, keeping its message.
pub(crate) trait StageResultExt<T> {
    fn or_stage(self, kind: impl FnOnce(String) -> ErrorKind) -> Result<T>;
}
impl<T, E> StageResultExt<T> for std::result::Result<T, exn::Exn<E>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn or_stage(self, kind: impl FnOnce(String) -> ErrorKind) -> Result<T> {
        self.map_err(|err| {
            let reason = err.to_string();
            err.raise(kind(reason))
        })
    }
}
