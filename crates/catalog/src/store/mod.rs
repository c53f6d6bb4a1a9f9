//! Catalog store capability and implementations.

use crate::CatalogRecord;
use crate::error::Result;
use async_trait::async_trait;

#[cfg(any(test, feature = "mock"))]
mod memory;
mod sqlite;

#[cfg(any(test, feature = "mock"))]
pub use self::memory::MemoryCatalog;
pub use self::sqlite::SqliteCatalog;

/// Key-value store recording one [`CatalogRecord`] per archive id.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Store a record, replacing any record with the same id.
    async fn put(&self, record: &CatalogRecord) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<CatalogRecord>>;

    /// Every record, ordered by timestamp then id.
    async fn list(&self) -> Result<Vec<CatalogRecord>>;
}
