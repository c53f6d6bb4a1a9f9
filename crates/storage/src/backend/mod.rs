//! Object store trait and implementations.

mod local;
#[cfg(any(test, feature = "mock"))]
mod mock;
#[cfg(feature = "s3")]
mod s3;

pub use self::local::LocalStore;
#[cfg(any(test, feature = "mock"))]
pub use self::mock::{MockStore, Upload};
#[cfg(feature = "s3")]
pub use self::s3::S3Store;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// A destination that local files are uploaded to.
///
/// Uploads are whole-file and overwrite any existing object at the same
/// address. Implementations must validate `bucket` and `key` with
/// [`validate_key`](crate::validate_key) before use.
///
/// # Examples
///
/// ```
/// use shelve_storage::{ObjectStore, join_key, error::Result};
/// use std::path::Path;
///
/// async fn upload_all(store: &dyn ObjectStore, bucket: &str, prefix: &str, files: &[&Path]) -> Result<u64> {
///     let mut total = 0;
///     for file in files {
///         let name = file.file_name().unwrap_or_default().to_string_lossy();
///         total += store.upload(bucket, &join_key([prefix, &*name]), file).await?;
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of this store (used in display/logging)
    fn name(&self) -> &str;

    /// Upload the file at `local_path` to `key` within `bucket`, returning
    /// the number of bytes uploaded.
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64>;
}
