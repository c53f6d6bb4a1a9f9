//! Configuration Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// The configuration file's extension is not one of toml, yaml or json.
    #[display("unsupported configuration format: {}", _0.display())]
    UnsupportedFormat(#[error(not(source))] PathBuf),
    /// The merged configuration could not be parsed.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// A value required by the selected settings is absent.
    #[display("missing configuration value: {_0}")]
    Missing(#[error(not(source))] &'static str),
}

impl From<figment::Error> for ErrorKind {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(err.to_string())
    }
}
