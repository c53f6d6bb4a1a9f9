//! Local filesystem object store.
//!
//! Buckets are directories beneath a configured root and keys are relative
//! paths inside them, so an upload of `(bucket, "a/b.json")` lands at
//! `<root>/<bucket>/a/b.json`. Useful for NAS mounts and for dry runs.

use crate::error::{ErrorKind, Result};
use crate::{ObjectStore, validate_key};
use async_trait::async_trait;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::instrument;

/// Local filesystem object store.
///
/// # Examples
///
/// ```no_run
/// use shelve_storage::backend::LocalStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalStore::new("nas", "/mnt/archives")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalStore {
    name: String,
    root: PathBuf,
}

impl LocalStore {
    /// Create a new local object store rooted at an absolute path.
    ///
    /// The root is created if it doesn't exist yet.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
            }
        } else {
            // Only happens once at startup; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| ErrorKind::from_io(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where an object is stored on disk.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let bucket = validate_key(bucket)?;
        if bucket.contains('/') {
            exn::bail!(ErrorKind::InvalidKey(bucket));
        }
        let key = validate_key(key)?;
        Ok(self.root.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, local_path), fields(store = %self.name))]
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let destination = self.object_path(bucket, key)?;
        // Fail on a missing source before creating any directories.
        fs::metadata(local_path).await.map_err(|e| ErrorKind::from_io(e, local_path))?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(|e| ErrorKind::from_io(e, parent))?;
        }
        let bytes = fs::copy(local_path, &destination).await.map_err(|e| ErrorKind::from_io(e, &destination))?;
        tracing::debug!(bytes, "Uploaded object");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn store() -> (tempfile::TempDir, LocalStore) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new("local", temp_dir.path().join("objects")).unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_upload_copies_into_bucket() {
        let (temp_dir, store) = store();
        let source = temp_dir.path().join("metadata.json");
        std::fs::write(&source, b"{}").unwrap();
        let bytes = store.upload("bucket1", "prefix/archive_202401010000/metadata.json", &source).await.unwrap();
        assert_eq!(bytes, 2);
        let uploaded = temp_dir.path().join("objects/bucket1/prefix/archive_202401010000/metadata.json");
        assert_eq!(std::fs::read(uploaded).unwrap(), b"{}");
        // Source is left in place.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_upload_overwrites() {
        let (temp_dir, store) = store();
        let source = temp_dir.path().join("data");
        std::fs::write(&source, b"first").unwrap();
        store.upload("b", "k", &source).await.unwrap();
        std::fs::write(&source, b"second").unwrap();
        store.upload("b", "k", &source).await.unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("objects/b/k")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_upload_missing_source() {
        let (temp_dir, store) = store();
        let missing = temp_dir.path().join("missing");
        let err = store.upload("b", "k", &missing).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(p) if p == &missing));
        assert!(!temp_dir.path().join("objects/b").exists());
    }

    #[rstest]
    #[case("bucket", "../escape")]
    #[case("..", "key")]
    #[case("nested/bucket", "key")]
    #[case("", "key")]
    #[case("bucket", "")]
    fn test_object_path_rejects(#[case] bucket: &str, #[case] key: &str) {
        let (_temp_dir, store) = store();
        let err = store.object_path(bucket, key).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[test]
    fn test_relative_root_rejected() {
        assert!(LocalStore::new("local", "relative/objects").is_err());
    }
}
