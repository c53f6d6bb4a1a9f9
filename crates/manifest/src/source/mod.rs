//! Tree source capabilities and implementations.
//!
//! A [`TreeSource`] answers "what is directly inside this folder?" and a
//! [`FileFetcher`] retrieves the bytes of a single file. Together they are
//! everything the [`ManifestBuilder`](crate::ManifestBuilder) and the
//! archival pipeline need from a remote file store.
//!
//! All calls are awaited one at a time by their callers; implementations
//! don't need to be re-entrant beyond `&self`.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;

pub use self::local::LocalTree;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockTree;
use crate::error::Result;
use crate::models::{FileRef, FolderRef};
use async_trait::async_trait;
use std::path::Path;

/// Hierarchical listing of a remote file store.
///
/// Files are partitioned into *native* files (formats that only exist inside
/// the remote service and cannot be downloaded as raw bytes) and
/// *non-native* files (everything else).
///
/// # Examples
///
/// ```
/// use shelve_manifest::{TreeSource, error::Result};
///
/// async fn count_children(source: &dyn TreeSource, name: &str) -> Result<usize> {
///     let Some(folder) = source.find_folder(name).await? else {
///         return Ok(0);
///     };
///     let folders = source.list_subfolders(&folder).await?;
///     let files = source.list_non_native_files(&folder).await?;
///     Ok(folders.len() + files.len())
/// }
/// ```
#[async_trait]
pub trait TreeSource: Send + Sync {
    /// Name of the configured source (used for logging only).
    fn name(&self) -> &str;

    /// Resolve a human-readable folder name to a folder reference.
    ///
    /// Returns the first match if several folders share the name, or
    /// `None` if there is no such folder.
    async fn find_folder(&self, name: &str) -> Result<Option<FolderRef>>;

    /// Direct subfolders of a folder.
    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>>;

    /// Direct native (non-downloadable) files of a folder.
    async fn list_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>>;

    /// Direct non-native (downloadable) files of a folder.
    async fn list_non_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>>;
}

/// Retrieval of raw file bytes from a remote file store.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Write the contents of `file` to the local `destination` path,
    /// creating parent directories as needed. Returns the number of bytes
    /// written.
    ///
    /// Failures are reported as [`Transfer`](crate::error::ErrorKind::Transfer)
    /// errors naming the file.
    async fn fetch_file(&self, file: &FileRef, destination: &Path) -> Result<u64>;
}
