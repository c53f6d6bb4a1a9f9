//! In-memory catalog store for testing.

use super::CatalogStore;
use crate::CatalogRecord;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory catalog store for testing.
///
/// Records live in a map behind a [`RwLock`]. A store built with
/// [`failing()`](Self::failing) rejects every operation, which is how tests
/// simulate an unreachable catalog.
#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<BTreeMap<String, CatalogRecord>>,
    failing: bool,
    puts: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    /// Number of `put` calls made, successful or not.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            exn::bail!(ErrorKind::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn put(&self, record: &CatalogRecord) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.records.write().await.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CatalogRecord>> {
        self.check()?;
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<CatalogRecord>> {
        self.check()?;
        let mut records: Vec<CatalogRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| (&a.timestamp, &a.id).cmp(&(&b.timestamp, &b.id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelve_archive::ArchiveMetadata;

    fn record(id: &str, timestamp: &str) -> CatalogRecord {
        CatalogRecord::from_metadata(&ArchiveMetadata {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            ..ArchiveMetadata::default()
        })
    }

    #[tokio::test]
    async fn test_put_get_list() {
        let catalog = MemoryCatalog::new();
        catalog.put(&record("b", "2024-01-01 00:00")).await.unwrap();
        catalog.put(&record("a", "2024-02-01 00:00")).await.unwrap();
        assert_eq!(catalog.get("b").await.unwrap().map(|r| r.id), Some("b".to_string()));
        let ids: Vec<String> = catalog.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(catalog.put_calls(), 2);
    }

    #[tokio::test]
    async fn test_failing_store() {
        let catalog = MemoryCatalog::failing();
        let err = catalog.put(&record("a", "2024-01-01 00:00")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Unavailable));
        assert_eq!(catalog.put_calls(), 1);
        assert!(catalog.get("a").await.is_err());
    }
}
