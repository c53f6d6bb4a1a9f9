//! S3-compatible object store.
//!
//! Works with AWS S3 and S3-compatible services (Backblaze B2, Tigris, MinIO).
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.
//!
//! TODO: support `credentials: "profile:name"` in config to use AWS SDK
//! credential providers (~/.aws/credentials) instead of explicit keys.

use crate::error::{ErrorKind, Result};
use crate::{ObjectStore, validate_key};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::SdkError,
    primitives::ByteStream,
};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// S3-compatible object store.
///
/// # Examples
///
/// ```no_run
/// use shelve_storage::backend::S3Store;
///
/// let store = S3Store::new(
///     "b2",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "access_key_id",
///     "secret_access_key",
/// );
/// ```
#[derive(Debug, Clone)]
pub struct S3Store {
    name: String,
    client: Client,
}

impl S3Store {
    /// Create a new S3 object store.
    ///
    /// # Arguments
    /// * `name` - A name for this store (used in display/logging)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - Access key ID
    /// * `key_secret` - Secret access key
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Self {
        let credentials = Credentials::new(key_id, key_secret, None, None, "shelve-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // A failed upload fails the stage; nothing is retried.
            .retry_config(RetryConfig::disabled())
            // Path-style addressing for S3-compatible services.
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, local_path), fields(store = %self.name))]
    async fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64> {
        let bucket = validate_key(bucket)?;
        let key = validate_key(key)?;
        let bytes = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| ErrorKind::from_io(e, local_path))?
            .len();
        let body = ByteStream::from_path(local_path).await.or_raise(|| ErrorKind::Transfer(key.clone()))?;
        let response = self.client.put_object().bucket(&bucket).key(&key).body(body).send().await;
        match response {
            Ok(_) => {
                tracing::debug!(bytes, "Uploaded object");
                Ok(bytes)
            },
            Err(err) => {
                let kind = match &err {
                    SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ErrorKind::Network(key),
                    _ => ErrorKind::Transfer(key),
                };
                Err(err).or_raise(|| kind)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> S3Store {
        S3Store::new("s3", "us-east-1", Some("http://127.0.0.1:1"), "id", "secret")
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_request() {
        let err = store().upload("bucket", "../escape", Path::new("/dev/null")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_missing_source_rejected_before_request() {
        let err = store().upload("bucket", "key", Path::new("/definitely/not/here")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_single_attempt_per_upload() {
        let store = store();
        let retry = store.client.config().retry_config().unwrap();
        assert_eq!(retry.max_attempts(), 1);
    }

    #[test]
    fn test_name() {
        assert_eq!(store().name(), "s3");
    }
}
