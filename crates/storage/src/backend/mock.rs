//! Recording object store for testing.

use crate::error::{ErrorKind, Result};
use crate::{ObjectStore, validate_key};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// An upload accepted by a [`MockStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub bucket: String,
    pub key: String,
    pub source: PathBuf,
    pub data: Vec<u8>,
}

/// Object store that records every upload in memory.
///
/// Keys registered with [`failing_key()`](Self::failing_key) are rejected
/// with a transfer error, which is how tests simulate a partial upload.
#[derive(Default)]
pub struct MockStore {
    uploads: RwLock<Vec<Upload>>,
    attempts: RwLock<usize>,
    failing_keys: HashSet<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject uploads to `key` (in any bucket).
    ///
    /// Panics if the key is invalid. If test setup is wrong, then the test
    /// should not pass.
    pub fn failing_key(mut self, key: &str) -> Self {
        let Ok(validated) = validate_key(key) else {
            panic!("MockStore::failing_key: invalid key {key}");
        };
        self.failing_keys.insert(validated);
        self
    }

    /// Successful uploads, in order.
    pub async fn uploads(&self) -> Vec<Upload> {
        self.uploads.read().await.clone()
    }

    /// Number of upload attempts, successful or not.
    pub async fn upload_calls(&self) -> usize {
        *self.attempts.read().await
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        *self.attempts.write().await += 1;
        let bucket = validate_key(bucket)?;
        let key = validate_key(key)?;
        if self.failing_keys.contains(&key) {
            exn::bail!(ErrorKind::Transfer(key));
        }
        let data = tokio::fs::read(local_path).await.map_err(|e| ErrorKind::from_io(e, local_path))?;
        let bytes = data.len() as u64;
        self.uploads.write().await.push(Upload {
            bucket,
            key,
            source: local_path.to_path_buf(),
            data,
        });
        Ok(bytes)
    }
}
