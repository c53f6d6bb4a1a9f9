//! Layered configuration for shelve.
//!
//! Values are merged in order, later sources winning:
//!
//! 1. Built-in defaults ([`Config::default()`]).
//! 2. A configuration file: the explicit path given to [`Config::load()`], or
//!    else the first of `shelve.toml`, `shelve.yaml`, `shelve.json` found in
//!    the user's configuration directory.
//! 3. Environment variables prefixed with `SHELVE_`, using `__` to reach
//!    into sections (`SHELVE_UPLOAD__BUCKET=archives`).
//!
//! ```toml
//! [source]
//! root = "/home/me/Google Drive"
//!
//! [archive]
//! compression = "bzip2"
//!
//! [archive.classification]
//! service_provider = "google"
//! directory_path = "s3://archives/drive/"
//!
//! [upload]
//! backend = "s3"
//! bucket = "archives"
//! region = "us-west-004"
//! key_id = "..."
//! key_secret = "..."
//! ```

pub mod error;
mod sections;

pub use crate::sections::{ArchiveConfig, CatalogConfig, PipelineConfig, SourceConfig, UploadBackend, UploadConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILE_STEM: &str = "shelve";
const FILE_EXTENSIONS: [&str; 3] = ["toml", "yaml", "json"];
const ENV_PREFIX: &str = "SHELVE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub archive: ArchiveConfig,
    pub catalog: CatalogConfig,
    pub upload: UploadConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            source: SourceConfig::default(),
            archive: ArchiveConfig::with_data_dir(&data_dir),
            catalog: CatalogConfig::with_data_dir(&data_dir),
            upload: UploadConfig::with_data_dir(&data_dir),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate the configuration.
    ///
    /// An explicit `file` must exist; without one, the user configuration
    /// directory is searched and a missing file is not an error.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file = match file {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => discover(),
        };
        match &file {
            Some(path) => tracing::debug!(path = %path.display(), "Loading configuration file"),
            None => tracing::debug!("No configuration file found, using defaults"),
        }
        Self::from_figment(Self::figment(file.as_deref())?)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = file {
            figment = match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().map_err(ErrorKind::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse fine but cannot be used together.
    pub fn validate(&self) -> Result<()> {
        self.archive.packager()?;
        self.upload.validate()
    }

    /// Scratch space for pipeline runs.
    pub fn work_dir(&self) -> PathBuf {
        self.pipeline.work_dir.clone().unwrap_or_else(|| self.archive.root.join(".staging"))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", FILE_STEM)
}

pub(crate) fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from("/var/lib/shelve"), |dirs| dirs.data_dir().to_path_buf())
}

fn discover() -> Option<PathBuf> {
    let dirs = project_dirs()?;
    FILE_EXTENSIONS
        .iter()
        .map(|ext| dirs.config_dir().join(format!("{FILE_STEM}.{ext}")))
        .find(|path| path.is_file())
}
