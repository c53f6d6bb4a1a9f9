use super::CatalogStore;
use crate::error::{Error, ErrorKind, Result};
use crate::{CatalogRecord, Database};
use async_trait::async_trait;
use exn::ResultExt;
use sqlx::SqlitePool;
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    timestamp: String,
    bucket: String,
    location_path: String,
    data_key: String,
    tags: String,
    metadata: String,
}
impl TryFrom<&CatalogRecord> for RecordRow {
    type Error = Error;
    fn try_from(record: &CatalogRecord) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: record.id.clone(),
            timestamp: record.timestamp.clone(),
            bucket: record.bucket.clone(),
            location_path: record.location_path.clone(),
            data_key: record.data_key.clone(),
            tags: serde_json::to_string(&record.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            metadata: serde_json::to_string(&record.metadata).or_raise(|| ErrorKind::InvalidData("metadata"))?,
        })
    }
}
impl TryFrom<RecordRow> for CatalogRecord {
    type Error = Error;
    fn try_from(row: RecordRow) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            timestamp: row.timestamp,
            bucket: row.bucket,
            location_path: row.location_path,
            data_key: row.data_key,
            tags: serde_json::from_str(&row.tags).or_raise(|| ErrorKind::InvalidData("tags"))?,
            metadata: serde_json::from_str(&row.metadata).or_raise(|| ErrorKind::InvalidData("metadata"))?,
        })
    }
}

/// Catalog persisted in a SQLite database.
///
/// Location fields are stored in their own (indexed) columns; tags and the
/// full metadata document are stored as JSON.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}
impl From<&Database> for SqliteCatalog {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Records whose location is in `bucket`, ordered by timestamp then id.
    pub async fn list_in_bucket(&self, bucket: &str) -> Result<Vec<CatalogRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(include_str!("../../queries/list_records_in_bucket.sql"))
            .bind(bucket)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CatalogRecord::try_from).collect()
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    #[instrument(skip_all, fields(id = %record.id))]
    async fn put(&self, record: &CatalogRecord) -> Result<()> {
        let row = RecordRow::try_from(record)?;
        sqlx::query(include_str!("../../queries/upsert_record.sql"))
            .bind(row.id)
            .bind(row.timestamp)
            .bind(row.bucket)
            .bind(row.location_path)
            .bind(row.data_key)
            .bind(row.tags)
            .bind(row.metadata)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tracing::debug!("Stored catalog record");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CatalogRecord>> {
        let row: Option<RecordRow> = sqlx::query_as(include_str!("../../queries/get_record.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(CatalogRecord::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<CatalogRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(include_str!("../../queries/list_records.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(CatalogRecord::try_from).collect()
    }
}
