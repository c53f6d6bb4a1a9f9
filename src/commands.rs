//! Command implementations. Each returns `Ok(false)` for a clean failure
//! whose explanation has already been printed.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use shelve_archive::ArchiveIdentity;
use shelve_catalog::{CatalogStore, Database, SqliteCatalog};
use shelve_config::{Config, UploadBackend, UploadConfig};
use shelve_manifest::ManifestBuilder;
use shelve_manifest::source::LocalTree;
use shelve_pipeline::{ArchiveRequest, Clients, Pipeline, PipelineSettings};
use shelve_storage::ObjectStore;
use shelve_storage::backend::LocalStore;
use std::path::Path;

const SOURCE_NAME: &str = "source";

pub async fn archive(
    config: &Config,
    folder: &str,
    name: Option<&str>,
    timestamp: Option<&str>,
    no_cleanup: bool,
) -> Result<bool> {
    let label = archive_label(name);
    let identity = match timestamp {
        Some(timestamp) => ArchiveIdentity::parse(timestamp, &label).or_raise(|| ErrorKind::Timestamp)?,
        None => ArchiveIdentity::now(&label),
    };
    let settings = pipeline_settings(config, no_cleanup)?;
    let tree = open_tree(config)?;
    let store = open_store(&config.upload)?;
    let database = Database::connect(&config.catalog.path).await.or_raise(|| ErrorKind::Catalog)?;
    let catalog = SqliteCatalog::from(&database);

    let clients = Clients {
        tree: &tree,
        fetcher: &tree,
        catalog: &catalog,
        store: store.as_ref(),
    };
    let request = ArchiveRequest::new(folder, identity).with_classification(config.archive.classification.clone());
    let outcome = Pipeline::new(clients, settings).run(&request).await;
    database.close().await;

    if outcome.success {
        println!("{}", outcome.archive_id);
    } else {
        eprintln!("{}", outcome.error_message);
    }
    Ok(outcome.success)
}

pub async fn snapshot(config: &Config, folder: &str, out: &Path) -> Result<bool> {
    let tree = open_tree(config)?;
    let manifest = ManifestBuilder::new(&tree)
        .include_native(config.source.include_native)
        .build_named(folder)
        .await
        .or_raise(|| ErrorKind::Snapshot)?;
    shelve_manifest::save(&manifest, out).or_raise(|| ErrorKind::Output)?;
    tracing::info!(files = manifest.file_count(), path = %out.display(), "Wrote manifest");
    Ok(true)
}

pub async fn catalog_get(config: &Config, id: &str) -> Result<bool> {
    let database = Database::connect(&config.catalog.path).await.or_raise(|| ErrorKind::Catalog)?;
    let record = SqliteCatalog::from(&database).get(id).await.or_raise(|| ErrorKind::Catalog);
    database.close().await;
    match record? {
        Some(record) => {
            println!("{}", serde_json::to_string_pretty(&record).or_raise(|| ErrorKind::Output)?);
            Ok(true)
        },
        None => {
            eprintln!("No archive with id {id}");
            Ok(false)
        },
    }
}

pub async fn catalog_list(config: &Config, bucket: Option<&str>) -> Result<bool> {
    let database = Database::connect(&config.catalog.path).await.or_raise(|| ErrorKind::Catalog)?;
    let catalog = SqliteCatalog::from(&database);
    let records = match bucket {
        Some(bucket) => catalog.list_in_bucket(bucket).await,
        None => catalog.list().await,
    }
    .or_raise(|| ErrorKind::Catalog);
    database.close().await;
    for record in records? {
        println!("{}\t{}\t{}/{}", record.id, record.timestamp, record.bucket, record.location_path);
    }
    Ok(true)
}

/// Archive ids can't contain spaces.
fn archive_label(name: Option<&str>) -> String {
    name.map(|name| name.trim().replace(' ', "_")).unwrap_or_default()
}

fn pipeline_settings(config: &Config, no_cleanup: bool) -> Result<PipelineSettings> {
    let mut settings = PipelineSettings::new(config.archive.root.clone(), config.upload.bucket.clone());
    settings.work_dir = config.work_dir();
    settings.manifest_file = config.archive.manifest_file.clone();
    settings.payload_stem = config.archive.payload_stem.clone();
    settings.packager = config.archive.packager().or_raise(|| ErrorKind::Config)?;
    settings.include_native = config.source.include_native;
    settings.key_prefix = config.upload.prefix.clone();
    settings.cleanup = config.pipeline.cleanup && !no_cleanup;
    Ok(settings)
}

fn open_tree(config: &Config) -> Result<LocalTree> {
    let root = config.source.root().or_raise(|| ErrorKind::Config)?;
    LocalTree::new(SOURCE_NAME, root).or_raise(|| ErrorKind::Source)
}

fn open_store(upload: &UploadConfig) -> Result<Box<dyn ObjectStore>> {
    match upload.backend {
        UploadBackend::Local => {
            let store = LocalStore::new("local", &upload.local_root).or_raise(|| ErrorKind::Store)?;
            Ok(Box::new(store))
        },
        UploadBackend::S3 => open_s3(upload),
    }
}

#[cfg(feature = "s3")]
fn open_s3(upload: &UploadConfig) -> Result<Box<dyn ObjectStore>> {
    use shelve_storage::backend::S3Store;

    let (Some(region), Some(key_id), Some(key_secret)) = (&upload.region, &upload.key_id, &upload.key_secret) else {
        exn::bail!(ErrorKind::Config);
    };
    Ok(Box::new(S3Store::new(
        "s3",
        region.as_str(),
        upload.endpoint.as_deref(),
        key_id.as_str(),
        key_secret.as_str(),
    )))
}

#[cfg(not(feature = "s3"))]
fn open_s3(_upload: &UploadConfig) -> Result<Box<dyn ObjectStore>> {
    tracing::error!("This build of shelve was compiled without S3 support");
    exn::bail!(ErrorKind::Store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use shelve_package::Compression;
    use std::fs;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        config: Config,
    }

    fn fixture() -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("drive/Finances/2024")).unwrap();
        fs::write(root.join("drive/Finances/budget.csv"), b"a,b,c").unwrap();
        fs::write(root.join("drive/Finances/2024/q1.pdf"), vec![0u8; 300]).unwrap();

        let mut config = Config::default();
        config.source.root = Some(root.join("drive"));
        config.archive.root = root.join("archives");
        config.archive.classification.directory_path = "s3://vault/drive/".to_string();
        config.catalog.path = root.join("catalog.sqlite");
        config.upload.bucket = "vault".to_string();
        config.upload.local_root = root.join("objects");
        config.pipeline.work_dir = None;
        Fixture {
            _temp_dir: temp_dir,
            config,
        }
    }

    #[rstest]
    #[case::absent(None, "")]
    #[case::plain(Some("Q1"), "Q1")]
    #[case::spaces(Some(" Q1 2024 taxes "), "Q1_2024_taxes")]
    fn test_archive_label(#[case] name: Option<&str>, #[case] expected: &str) {
        assert_eq!(archive_label(name), expected);
    }

    #[rstest]
    #[case::from_config(false, true)]
    #[case::overridden(true, false)]
    fn test_pipeline_settings(#[case] no_cleanup: bool, #[case] cleanup: bool) {
        let mut config = fixture().config;
        config.archive.compression = "bzip2".to_string();
        config.upload.prefix = "drive".to_string();
        let settings = pipeline_settings(&config, no_cleanup).unwrap();
        assert_eq!(settings.cleanup, cleanup);
        assert_eq!(settings.packager.compression(), Compression::Bzip2);
        assert_eq!(settings.bucket, "vault");
        assert_eq!(settings.key_prefix, "drive");
        assert_eq!(settings.work_dir, config.archive.root.join(".staging"));
    }

    #[test]
    fn test_source_root_required() {
        let mut config = fixture().config;
        config.source.root = None;
        let err = open_tree(&config).unwrap_err();
        assert_eq!(*err, ErrorKind::Config);
    }

    #[tokio::test]
    async fn test_archive_then_query_catalog() {
        let Fixture { _temp_dir, config } = fixture();

        let success = archive(&config, "Finances", Some("Q1 2024"), Some("2024-01-01 09:30"), false)
            .await
            .unwrap();
        assert!(success);

        let objects = config.upload.local_root.join("vault/drive/archive_202401010930_Q1_2024");
        assert!(objects.join("metadata.json").is_file());
        assert!(objects.join("directory.json").is_file());
        assert!(objects.join("data.tar.gz").is_file());
        // Cleanup removed the local bundle.
        assert!(!config.archive.root.join("archive_202401010930_Q1_2024").exists());

        // The catalogued payload key names an object that was uploaded.
        let database = Database::connect(&config.catalog.path).await.unwrap();
        let record = SqliteCatalog::from(&database).get("archive_202401010930_Q1_2024").await.unwrap().unwrap();
        database.close().await;
        assert_eq!(record.data_key, "drive/archive_202401010930_Q1_2024/data.tar.gz");
        assert!(config.upload.local_root.join(&record.bucket).join(&record.data_key).is_file());

        assert!(catalog_get(&config, "archive_202401010930_Q1_2024").await.unwrap());
        assert!(!catalog_get(&config, "archive_209901010000").await.unwrap());
        assert!(catalog_list(&config, Some("vault")).await.unwrap());
    }

    #[tokio::test]
    async fn test_archive_reports_failure() {
        let Fixture { _temp_dir, config } = fixture();
        let success = archive(&config, "Missing", None, None, false).await.unwrap();
        assert!(!success);
    }

    #[tokio::test]
    async fn test_snapshot_writes_manifest() {
        let Fixture { _temp_dir, config } = fixture();
        let out = config.catalog.path.with_file_name("finances.json");
        assert!(snapshot(&config, "Finances", &out).await.unwrap());
        let manifest = shelve_manifest::load(&out).unwrap();
        assert_eq!(manifest.name(), "Finances");
        assert_eq!(manifest.file_count(), 2);
        assert_eq!(manifest.aggregated_size_bytes(), Some(305));
    }
}
