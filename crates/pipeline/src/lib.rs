//! The archive-and-ship pipeline.
//!
//! ```text
//! snapshot -> fetch+package -> bundle -> catalog -> upload -> cleanup
//! ```
//!
//! 1. **Snapshot**: build the [`DirectoryManifest`](shelve_manifest::DirectoryManifest)
//!    of the named folder and persist it.
//! 2. **Fetch+package**: download every non-native file into a scratch tree
//!    and pack it into a single payload.
//! 3. **Bundle**: move manifest and payload into a saved
//!    [`ArchiveBundle`](shelve_archive::ArchiveBundle) with its metadata.
//! 4. **Catalog**: derive a [`CatalogRecord`](shelve_catalog::CatalogRecord)
//!    and store it.
//! 5. **Upload**: ship every bundle file to object storage.
//! 6. **Cleanup**: remove local bundle and scratch space, if requested.
//!
//! Stages 1-5 are gated: each runs only if its predecessor succeeded. The
//! outcome is a success flag plus the messages of whatever failed.

pub mod error;
mod pipeline;
mod stage;
mod stages;

pub use crate::pipeline::{ArchiveRequest, Clients, Pipeline, PipelineOutcome, PipelineSettings};
pub use crate::stage::{Stage, StageState};
