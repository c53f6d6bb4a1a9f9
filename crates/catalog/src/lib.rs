//! Archive catalog.
//!
//! Every saved archive gets one [`CatalogRecord`], derived from its metadata,
//! stored in a [`CatalogStore`] keyed by archive id. The catalog is an index:
//! the archive bundles themselves remain the source of truth.
//!
//! [`SqliteCatalog`] is the persistent store. [`MemoryCatalog`] (feature
//! `mock`) is for tests.

mod db;
pub mod error;
mod record;
mod store;

pub use crate::db::Database;
pub use crate::record::CatalogRecord;
#[cfg(any(test, feature = "mock"))]
pub use crate::store::MemoryCatalog;
pub use crate::store::{CatalogStore, SqliteCatalog};
