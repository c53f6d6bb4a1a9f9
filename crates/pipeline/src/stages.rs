//! The individual stages. Each returns its own result; gating is the
//! orchestrator's business.

use crate::error::{ErrorKind, Result, StageResultExt};
use exn::ResultExt;
use shelve_archive::{ArchiveBundle, ArchiveIdentity, Classification};
use shelve_catalog::{CatalogRecord, CatalogStore};
use shelve_manifest::{DirectoryManifest, FileFetcher, ManifestBuilder, TreeSource, sanitize_component};
use shelve_package::{Packager, Payload};
use shelve_storage::{ObjectStore, join_key};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Build the manifest of the named folder and persist it to `document`.
#[instrument(skip(tree, document), fields(source = tree.name()))]
pub(crate) async fn snapshot(
    tree: &dyn TreeSource,
    folder: &str,
    include_native: bool,
    document: &Path,
) -> Result<DirectoryManifest> {
    let manifest = ManifestBuilder::new(tree)
        .include_native(include_native)
        .build_named(folder)
        .await
        .or_stage(ErrorKind::Snapshot)?;
    shelve_manifest::save(&manifest, document).or_stage(ErrorKind::Snapshot)?;
    Ok(manifest)
}

/// Fetch every non-native file of the manifest into `download_dir`, then
/// pack that tree into the payload at `payload_path`.
#[instrument(skip_all, fields(folder = manifest.name()))]
pub(crate) async fn fetch_and_package(
    fetcher: &dyn FileFetcher,
    manifest: &DirectoryManifest,
    download_dir: &Path,
    packager: Packager,
    payload_path: &Path,
) -> Result<Payload> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .or_raise(|| ErrorKind::Fetch(download_dir.display().to_string()))?;
    let mut fetched = 0u64;
    for (directory, file) in manifest.non_native_entries() {
        let destination = download_dir.join(directory).join(sanitize_component(&file.name));
        let bytes = fetcher.fetch_file(file, &destination).await.or_stage(ErrorKind::Fetch)?;
        tracing::debug!(file = %file.name, bytes, "Fetched file");
        fetched += bytes;
    }
    tracing::info!(bytes = fetched, "Fetched folder contents");

    let source = download_dir.to_path_buf();
    let destination = payload_path.to_path_buf();
    tokio::task::spawn_blocking(move || packager.pack(&source, &destination))
        .await
        .or_raise(|| ErrorKind::Package(payload_path.display().to_string()))?
        .or_stage(ErrorKind::Package)
}

/// Assemble the bundle from the persisted manifest and payload and save it
/// under `archive_root`.
#[instrument(skip_all, fields(id = %identity))]
pub(crate) fn bundle(
    identity: &ArchiveIdentity,
    classification: &Classification,
    manifest: DirectoryManifest,
    manifest_path: &Path,
    payload: &Payload,
    archive_root: &Path,
) -> Result<ArchiveBundle> {
    let mut bundle =
        ArchiveBundle::new(identity.clone(), classification, manifest_path, &payload.path).with_manifest(manifest);
    bundle.save(archive_root).or_stage(ErrorKind::Bundle)?;
    Ok(bundle)
}

#[instrument(skip_all, fields(id = %bundle.identity()))]
pub(crate) async fn catalog(store: &dyn CatalogStore, bundle: &ArchiveBundle) -> Result<CatalogRecord> {
    let record = CatalogRecord::from_metadata(bundle.metadata());
    store.put(&record).await.or_stage(ErrorKind::Catalog)?;
    tracing::info!(bucket = %record.bucket, location = %record.location_path, "Catalogued archive");
    Ok(record)
}

/// Where the bundle's objects go, as `(bucket, key prefix)`.
///
/// A record whose location parsed from `directory_path` is authoritative, so
/// the catalogued keys are the uploaded ones. Otherwise the configured
/// bucket is used with `<key_prefix>/<archive id>`.
pub(crate) fn upload_location(record: &CatalogRecord, bucket: &str, key_prefix: &str) -> (String, String) {
    if record.bucket.is_empty() {
        return (bucket.to_string(), join_key([key_prefix, record.id.as_str()]));
    }
    if record.bucket != bucket {
        tracing::debug!(configured = bucket, catalogued = %record.bucket, "Uploading to the catalogued bucket");
    }
    (record.bucket.clone(), record.location_path.clone())
}

/// Upload every file of the saved bundle directory to
/// `<bucket>/<location>/<filename>`, in filename order.
///
/// The first failure stops the stage; objects already uploaded stay.
#[instrument(skip(store, directory), fields(store = store.name()))]
pub(crate) async fn upload(store: &dyn ObjectStore, directory: &Path, bucket: &str, location: &str) -> Result<u64> {
    let listing_failed = || ErrorKind::Upload(directory.display().to_string());
    let mut files: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(directory).await.or_raise(listing_failed)?;
    while let Some(entry) = entries.next_entry().await.or_raise(listing_failed)? {
        if entry.file_type().await.or_raise(listing_failed)?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut uploaded = 0u64;
    for file in &files {
        let name = file.file_name().unwrap_or_default().to_string_lossy();
        let key = join_key([location, &*name]);
        uploaded += store.upload(bucket, &key, file).await.or_stage(ErrorKind::Upload)?;
        tracing::debug!(bucket, key = %key, "Uploaded bundle file");
    }
    tracing::info!(files = files.len(), bytes = uploaded, bucket, "Uploaded archive");
    Ok(uploaded)
}

/// Remove a directory tree, returning whether anything was removed. Errors
/// are logged and otherwise ignored.
pub(crate) async fn remove_tree(path: &Path) -> bool {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed directory");
            true
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Could not remove directory");
            false
        },
    }
}
