use regex::Regex;
use serde::{Deserialize, Serialize};
use shelve_archive::ArchiveMetadata;
use std::sync::LazyLock;

/// `<scheme>://<bucket>/<rest>`
static LOCATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^:/]+)://([^/]+)/(.*)$").unwrap());

/// A catalog entry describing where an archive lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub timestamp: String,
    /// Bucket parsed from the metadata's `directory_path`.
    pub bucket: String,
    /// Bucket-relative prefix of the archive, ending in `<id>/`.
    pub location_path: String,
    /// Bucket-relative key of the payload.
    pub data_key: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub metadata: ArchiveMetadata,
}

impl CatalogRecord {
    /// Derive a record from archive metadata.
    ///
    /// The location fields are only populated when `directory_path` has the
    /// form `<scheme>://<bucket>/<rest>`; otherwise they stay empty and the
    /// record is still usable. Derivation is pure: the same metadata always
    /// yields the same record.
    ///
    /// # Examples
    ///
    /// ```
    /// use shelve_archive::ArchiveMetadata;
    /// use shelve_catalog::CatalogRecord;
    ///
    /// let metadata = ArchiveMetadata {
    ///     id: "archive_202401010000".to_string(),
    ///     directory_path: "s3://bucket1/prefix/".to_string(),
    ///     data_file: "data.zip".to_string(),
    ///     ..ArchiveMetadata::default()
    /// };
    /// let record = CatalogRecord::from_metadata(&metadata);
    /// assert_eq!(record.bucket, "bucket1");
    /// assert_eq!(record.location_path, "prefix/archive_202401010000/");
    /// assert_eq!(record.data_key, "prefix/archive_202401010000/data.zip");
    /// ```
    pub fn from_metadata(metadata: &ArchiveMetadata) -> Self {
        let mut record = Self {
            id: metadata.id.clone(),
            timestamp: metadata.timestamp.clone(),
            bucket: String::new(),
            location_path: String::new(),
            data_key: String::new(),
            tags: Vec::new(),
            metadata: metadata.clone(),
        };
        match LOCATION.captures(&metadata.directory_path) {
            Some(captures) => {
                record.bucket = captures[2].to_string();
                record.location_path = format!("{}{}/", &captures[3], metadata.id);
                record.data_key = format!("{}{}", record.location_path, metadata.data_file);
            },
            None => tracing::warn!(
                id = %metadata.id,
                directory_path = %metadata.directory_path,
                "Directory path is not a storage location; catalog record has no location"
            ),
        }
        record
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn metadata(directory_path: &str) -> ArchiveMetadata {
        ArchiveMetadata {
            id: "archive_202401010000".to_string(),
            timestamp: "2024-01-01 00:00".to_string(),
            directory_path: directory_path.to_string(),
            data_file: "data.zip".to_string(),
            ..ArchiveMetadata::default()
        }
    }

    #[test]
    fn test_s3_location() {
        let record = CatalogRecord::from_metadata(&metadata("s3://bucket1/prefix/"));
        assert_eq!(record.id, "archive_202401010000");
        assert_eq!(record.timestamp, "2024-01-01 00:00");
        assert_eq!(record.bucket, "bucket1");
        assert_eq!(record.location_path, "prefix/archive_202401010000/");
        assert_eq!(record.data_key, "prefix/archive_202401010000/data.zip");
        assert!(record.tags.is_empty());
        assert_eq!(record.metadata, metadata("s3://bucket1/prefix/"));
    }

    #[rstest]
    #[case("s3://bucket1/", "bucket1", "archive_202401010000/")]
    #[case("gs://archive-store/a/b/", "archive-store", "a/b/archive_202401010000/")]
    #[case("file://local/x/", "local", "x/archive_202401010000/")]
    fn test_locations(#[case] directory_path: &str, #[case] bucket: &str, #[case] location_path: &str) {
        let record = CatalogRecord::from_metadata(&metadata(directory_path));
        assert_eq!(record.bucket, bucket);
        assert_eq!(record.location_path, location_path);
        assert_eq!(record.data_key, format!("{location_path}data.zip"));
    }

    #[rstest]
    #[case("")]
    #[case("bucket1/prefix/")]
    #[case("s3://bucket1")]
    #[case("/var/archives/")]
    fn test_unparseable_location_leaves_fields_empty(#[case] directory_path: &str) {
        let record = CatalogRecord::from_metadata(&metadata(directory_path));
        assert_eq!(record.id, "archive_202401010000");
        assert_eq!(record.timestamp, "2024-01-01 00:00");
        assert!(record.bucket.is_empty());
        assert!(record.location_path.is_empty());
        assert!(record.data_key.is_empty());
        assert_eq!(record.metadata.directory_path, directory_path);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let metadata = metadata("s3://bucket1/prefix/");
        assert_eq!(CatalogRecord::from_metadata(&metadata), CatalogRecord::from_metadata(&metadata));
    }
}
