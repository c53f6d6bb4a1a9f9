//! Archive bundles.
//!
//! An archive is identified by an [`ArchiveIdentity`] (creation minute plus an
//! optional label) and materialised on local storage as an [`ArchiveBundle`]:
//! one directory named after the archive id, holding the
//! [`ArchiveMetadata`] record, the manifest document and the payload.
//!
//! ```text
//! <root>/<archive_id>/
//!     metadata.json
//!     directory.json
//!     data.tar.gz
//! ```
//!
//! The payload is a tar stream (gzip-compressed unless configured otherwise),
//! not a zip archive, so consumers expecting the older `data.zip` layout must
//! read the payload name from the metadata's `data_file` rather than assume
//! it. Metadata documents that name `data.zip` still load unchanged.

mod bundle;
pub mod error;
mod identity;
mod metadata;

pub use crate::bundle::ArchiveBundle;
pub use crate::identity::ArchiveIdentity;
pub use crate::metadata::{ArchiveMetadata, Classification};

/// Filename of the metadata record inside a bundle.
pub const METADATA_FILE: &str = "metadata.json";
/// Default filename of the manifest document inside a bundle.
pub const DIRECTORY_FILE_DEFAULT: &str = "directory.json";
/// Default filename of the payload inside a bundle: a gzip-compressed tar.
pub const DATA_FILE_DEFAULT: &str = "data.tar.gz";
