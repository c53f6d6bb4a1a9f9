//! Folder-tree manifests.
//!
//! A [`DirectoryManifest`] describes the structure of a folder tree (its
//! subfolders, its native and non-native files) together with the aggregated
//! size and last-modified time of everything beneath each folder. It says
//! nothing about file *contents*; those are fetched separately through a
//! [`FileFetcher`].
//!
//! Manifests are produced by the [`ManifestBuilder`], which walks any
//! [`TreeSource`] recursively and assembles the tree bottom-up, and are
//! persisted as JSON documents with [`save`] and [`load`].

mod build;
mod document;
pub mod error;
mod models;
mod path;
pub mod source;

pub use crate::build::ManifestBuilder;
pub use crate::document::{load, save};
pub use crate::models::{DirectoryManifest, FileRef, FolderRef};
pub use crate::path::sanitize_component;
pub use crate::source::{FileFetcher, TreeSource};
