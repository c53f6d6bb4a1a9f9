use crate::error::{ErrorKind, Result};
use crate::identity::ArchiveIdentity;
use crate::{DATA_FILE_DEFAULT, DIRECTORY_FILE_DEFAULT};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use shelve_manifest::DirectoryManifest;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Classification fields supplied by whoever requests an archive.
///
/// Every field defaults to an empty string and is copied verbatim into the
/// archive's [`ArchiveMetadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    /// e.g. `google`
    pub service_provider: String,
    pub account_id: String,
    /// Remote location prefix, e.g. `s3://bucket/prefix/`.
    pub directory_path: String,
    pub directory_url: String,
    pub security_class: String,
    pub permissions: String,
    /// `YYYY-MM-DD`
    pub expiration_date: String,
}

/// The descriptive record stored alongside an archive.
///
/// Serialized field order is the declaration order below and is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveMetadata {
    pub id: String,
    pub name: String,
    pub timestamp: String,
    pub service_provider: String,
    pub account_id: String,
    pub directory_path: String,
    pub directory_url: String,
    pub size_bytes: Option<u64>,
    #[serde(rename = "size_MB")]
    pub size_mb: Option<f64>,
    pub directory_file: String,
    pub data_file: String,
    pub security_class: String,
    pub permissions: String,
    pub expiration_date: String,
}

impl Default for ArchiveMetadata {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            timestamp: String::new(),
            service_provider: String::new(),
            account_id: String::new(),
            directory_path: String::new(),
            directory_url: String::new(),
            size_bytes: None,
            size_mb: None,
            directory_file: DIRECTORY_FILE_DEFAULT.to_string(),
            data_file: DATA_FILE_DEFAULT.to_string(),
            security_class: String::new(),
            permissions: String::new(),
            expiration_date: String::new(),
        }
    }
}

impl ArchiveMetadata {
    /// Defaults overlaid with an identity and classification.
    pub fn new(identity: &ArchiveIdentity, classification: &Classification) -> Self {
        let Classification {
            service_provider,
            account_id,
            directory_path,
            directory_url,
            security_class,
            permissions,
            expiration_date,
        } = classification.clone();
        Self {
            id: identity.id().to_string(),
            name: identity.name().unwrap_or_default().to_string(),
            timestamp: identity.timestamp(),
            service_provider,
            account_id,
            directory_path,
            directory_url,
            security_class,
            permissions,
            expiration_date,
            ..Self::default()
        }
    }

    /// Take the size of the archived folder from its manifest.
    pub fn apply_manifest(&mut self, manifest: &DirectoryManifest) {
        self.size_bytes = manifest.aggregated_size_bytes();
        self.size_mb = self.size_bytes.map(megabytes);
    }

    /// Write as JSON with four-space indentation.
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(ErrorKind::io(path))?;
        let mut writer = BufWriter::new(file);
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer).or_raise(|| ErrorKind::Metadata(path.to_path_buf()))?;
        writer.flush().map_err(ErrorKind::io(path))?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(ErrorKind::io(path))?;
        serde_json::from_reader(BufReader::new(file)).or_raise(|| ErrorKind::Metadata(path.to_path_buf()))
    }
}

fn megabytes(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}
