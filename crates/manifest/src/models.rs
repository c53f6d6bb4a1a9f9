//! Manifest models.
//!
//! These types are both the in-memory tree produced by the
//! [`ManifestBuilder`](crate::ManifestBuilder) and the schema of the persisted
//! manifest document.

use crate::path::sanitize_component;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Opaque reference to a folder in a [`TreeSource`](crate::TreeSource).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderRef {
    /// Identifier understood by the tree source that produced it.
    pub id: String,
    /// Human-readable folder name.
    pub name: String,
}
impl FolderRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Reference to a single file in a [`TreeSource`](crate::TreeSource).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Identifier understood by the tree source that produced it.
    pub id: String,
    pub name: String,
    /// Last modified timestamp, if the source reports one.
    #[serde(rename = "modified_time", default, with = "time::serde::rfc3339::option")]
    pub last_modified: Option<OffsetDateTime>,
    /// File size in bytes, if the source reports one. Native documents
    /// usually don't.
    #[serde(rename = "size", default)]
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub mime_type: String,
}
impl FileRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_modified: None,
            size_bytes: None,
            mime_type: mime_type.into(),
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_last_modified(mut self, last_modified: OffsetDateTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }
}

/// One node of a folder tree, with aggregated metadata for everything below it.
///
/// Nodes are immutable once assembled: [`new()`](Self::new) computes the
/// aggregates from the node's direct files and already-built subfolders, so
/// the tree can only be put together bottom-up. Each subfolder is owned by
/// exactly one parent.
///
/// # Aggregates
/// - `size`: sum of every descendant file that reports a size. Files without
///   a size are left out of the sum rather than counted as zero; if nothing
///   reports a size the aggregate is absent.
/// - `modified_time`: latest timestamp among descendant files and subfolder
///   aggregates, or absent if none of them carry one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryManifest {
    name: String,
    #[serde(rename = "modified_time", default, with = "time::serde::rfc3339::option")]
    aggregated_last_modified: Option<OffsetDateTime>,
    #[serde(rename = "size", default)]
    aggregated_size_bytes: Option<u64>,
    #[serde(rename = "folders", default)]
    subfolders: Vec<DirectoryManifest>,
    #[serde(default)]
    native_files: Vec<FileRef>,
    #[serde(default)]
    non_native_files: Vec<FileRef>,
}

impl DirectoryManifest {
    /// Assemble a folder node from its direct files and built subfolders.
    pub fn new(
        name: impl Into<String>,
        native_files: Vec<FileRef>,
        non_native_files: Vec<FileRef>,
        subfolders: Vec<DirectoryManifest>,
    ) -> Self {
        let aggregated_size_bytes = sum_reported(
            non_native_files
                .iter()
                .chain(native_files.iter())
                .map(|file| file.size_bytes)
                .chain(subfolders.iter().map(|folder| folder.aggregated_size_bytes)),
        );
        let aggregated_last_modified = non_native_files
            .iter()
            .chain(native_files.iter())
            .map(|file| file.last_modified)
            .chain(subfolders.iter().map(|folder| folder.aggregated_last_modified))
            .flatten()
            .max();
        Self {
            name: name.into(),
            aggregated_last_modified,
            aggregated_size_bytes,
            subfolders,
            native_files,
            non_native_files,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aggregated_last_modified(&self) -> Option<OffsetDateTime> {
        self.aggregated_last_modified
    }

    pub fn aggregated_size_bytes(&self) -> Option<u64> {
        self.aggregated_size_bytes
    }

    pub fn native_files(&self) -> &[FileRef] {
        &self.native_files
    }

    pub fn non_native_files(&self) -> &[FileRef] {
        &self.non_native_files
    }

    pub fn subfolders(&self) -> &[DirectoryManifest] {
        &self.subfolders
    }

    /// Number of files (native and non-native) anywhere beneath this node.
    pub fn file_count(&self) -> usize {
        self.native_files.len()
            + self.non_native_files.len()
            + self.subfolders.iter().map(DirectoryManifest::file_count).sum::<usize>()
    }

    /// Every non-native file beneath this node, paired with the path of the
    /// folder it lives in relative to this node (built from folder names,
    /// each passed through [`sanitize_component`]).
    ///
    /// Files directly in this node have an empty relative path. Order is
    /// depth-first: a folder's own files, then each subfolder in turn.
    pub fn non_native_entries(&self) -> Vec<(PathBuf, &FileRef)> {
        let mut entries = Vec::new();
        self.collect_non_native(PathBuf::new(), &mut entries);
        entries
    }

    fn collect_non_native<'a>(&'a self, dir: PathBuf, entries: &mut Vec<(PathBuf, &'a FileRef)>) {
        entries.extend(self.non_native_files.iter().map(|file| (dir.clone(), file)));
        for folder in &self.subfolders {
            folder.collect_non_native(dir.join(sanitize_component(&folder.name)), entries);
        }
    }
}

/// Sum only the values that are present; `None` if there are none.
fn sum_reported(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    values.flatten().fold(None, |total, size| Some(total.unwrap_or(0).saturating_add(size)))
}
