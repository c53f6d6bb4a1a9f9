use crate::data_dir;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use serde::{Deserialize, Serialize};
use shelve_archive::{Classification, DIRECTORY_FILE_DEFAULT};
use shelve_package::{Compression, Packager};
use std::path::{Path, PathBuf};

/// The folder tree archives are taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Absolute directory acting as the remote tree.
    pub root: Option<PathBuf>,
    /// Record native (non-downloadable) documents in the manifest.
    pub include_native: bool,
}

impl SourceConfig {
    pub fn root(&self) -> Result<&Path> {
        self.root.as_deref().ok_or_raise(|| ErrorKind::Missing("source.root"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Saved bundles land in `<root>/<archive id>/`.
    pub root: PathBuf,
    pub manifest_file: String,
    /// Payload filename without extension.
    pub payload_stem: String,
    /// `none`, `gzip` or `bzip2`.
    pub compression: String,
    /// Copied into every archive's metadata.
    pub classification: Classification,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::with_data_dir(&data_dir())
    }
}

impl ArchiveConfig {
    pub(crate) fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("archives"),
            manifest_file: DIRECTORY_FILE_DEFAULT.to_string(),
            payload_stem: "data".to_string(),
            compression: Compression::default().to_string(),
            classification: Classification::default(),
        }
    }

    pub fn packager(&self) -> Result<Packager> {
        let compression: Compression = self
            .compression
            .parse::<Compression>()
            .or_raise(|| ErrorKind::Invalid(format!("archive.compression: {}", self.compression)))?;
        Ok(Packager::new(compression))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file; created on first use.
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self::with_data_dir(&data_dir())
    }
}

impl CatalogConfig {
    pub(crate) fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("catalog.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadBackend {
    /// Copy objects into a local directory.
    #[default]
    Local,
    /// Put objects to an S3-compatible service.
    S3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub backend: UploadBackend,
    /// Used when `archive.classification.directory_path` names no bucket.
    pub bucket: String,
    /// Prepended to object keys alongside `bucket`.
    pub prefix: String,
    /// Root directory of the `local` backend.
    pub local_root: PathBuf,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    pub key_id: Option<String>,
    pub key_secret: Option<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self::with_data_dir(&data_dir())
    }
}

impl UploadConfig {
    pub(crate) fn with_data_dir(data_dir: &Path) -> Self {
        Self {
            backend: UploadBackend::default(),
            bucket: "archives".to_string(),
            prefix: String::new(),
            local_root: data_dir.join("objects"),
            region: None,
            endpoint: None,
            key_id: None,
            key_secret: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            exn::bail!(ErrorKind::Missing("upload.bucket"));
        }
        if self.backend == UploadBackend::S3 {
            let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
            if !present(&self.region) {
                exn::bail!(ErrorKind::Missing("upload.region"));
            }
            if !present(&self.key_id) {
                exn::bail!(ErrorKind::Missing("upload.key_id"));
            }
            if !present(&self.key_secret) {
                exn::bail!(ErrorKind::Missing("upload.key_secret"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remove the local bundle and scratch space after each run.
    pub cleanup: bool,
    /// Scratch space; defaults to `<archive.root>/.staging`.
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleanup: true,
            work_dir: None,
        }
    }
}
