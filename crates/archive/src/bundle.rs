use crate::METADATA_FILE;
use crate::error::{ErrorKind, Result};
use crate::identity::ArchiveIdentity;
use crate::metadata::{ArchiveMetadata, Classification};
use exn::ResultExt;
use shelve_manifest::DirectoryManifest;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// An archive assembled from a manifest document and a payload file.
///
/// [`save()`](Self::save) moves both source files into `<root>/<id>/`
/// together with a freshly written `metadata.json`. The sources are moved,
/// not copied, so a bundle can be saved exactly once: saving again fails
/// with an I/O error because the sources are gone.
#[derive(Debug)]
pub struct ArchiveBundle {
    identity: ArchiveIdentity,
    metadata: ArchiveMetadata,
    manifest: Option<DirectoryManifest>,
    manifest_source: PathBuf,
    payload_source: PathBuf,
    local_path: Option<PathBuf>,
}

impl ArchiveBundle {
    /// Bundle the manifest document at `manifest_source` with the payload at
    /// `payload_source`. Their filenames are kept inside the bundle.
    pub fn new(
        identity: ArchiveIdentity,
        classification: &Classification,
        manifest_source: impl Into<PathBuf>,
        payload_source: impl Into<PathBuf>,
    ) -> Self {
        let manifest_source = manifest_source.into();
        let payload_source = payload_source.into();
        let mut metadata = ArchiveMetadata::new(&identity, classification);
        if let Some(name) = file_name(&manifest_source) {
            metadata.directory_file = name;
        }
        if let Some(name) = file_name(&payload_source) {
            metadata.data_file = name;
        }
        Self {
            identity,
            metadata,
            manifest: None,
            manifest_source,
            payload_source,
            local_path: None,
        }
    }

    /// Use an already-built manifest instead of parsing the document on save.
    pub fn with_manifest(mut self, manifest: DirectoryManifest) -> Self {
        self.metadata.apply_manifest(&manifest);
        self.manifest = Some(manifest);
        self
    }

    pub fn identity(&self) -> &ArchiveIdentity {
        &self.identity
    }

    pub fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// The bundle directory, once saved.
    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    /// Where the bundle lands remotely: `directory_path` followed by the
    /// archive id, e.g. `s3://bucket/prefix/archive_202401010000/`.
    pub fn remote_path(&self) -> String {
        format!("{}{}/", self.metadata.directory_path, self.identity.id())
    }

    /// Materialise the bundle under `root`, returning the bundle directory.
    ///
    /// `root` is created if missing. An existing bundle directory is reused
    /// and files in it are replaced.
    #[instrument(skip(self), fields(id = %self.identity))]
    pub fn save(&mut self, root: &Path) -> Result<PathBuf> {
        if self.manifest.is_none() {
            let manifest = shelve_manifest::load(&self.manifest_source)
                .or_raise(|| ErrorKind::Manifest(self.manifest_source.clone()))?;
            self.metadata.apply_manifest(&manifest);
            self.manifest = Some(manifest);
        }

        ensure_directory(root)?;
        let directory = root.join(self.identity.id());
        ensure_directory(&directory)?;

        let staged = root.join(format!(".{}.{METADATA_FILE}", self.identity.id()));
        self.metadata.write(&staged)?;
        move_file(&staged, &directory.join(METADATA_FILE))?;
        move_file(&self.manifest_source, &directory.join(&self.metadata.directory_file))?;
        move_file(&self.payload_source, &directory.join(&self.metadata.data_file))?;

        tracing::info!(path = %directory.display(), size = self.metadata.size_bytes, "Saved archive bundle");
        self.local_path = Some(directory.clone());
        Ok(directory)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        exn::bail!(ErrorKind::NotADirectory(path.to_path_buf()));
    }
    fs::create_dir_all(path).map_err(ErrorKind::io(path))?;
    Ok(())
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // Temporary directories and archive roots may sit on different mounts.
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to).map_err(ErrorKind::io(from))?;
            fs::remove_file(from).map_err(ErrorKind::io(from))?;
            Ok(())
        },
        Err(e) => Err(ErrorKind::Io(from.to_path_buf(), e).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelve_manifest::FileRef;
    use time::macros::datetime;

    struct Staging {
        temp_dir: tempfile::TempDir,
        manifest: PathBuf,
        payload: PathBuf,
    }

    fn staging() -> Staging {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = FileRef::new("f1", "q1.pdf", "application/pdf").with_size(450);
        let manifest = DirectoryManifest::new("Finances", vec![], vec![file], vec![]);
        let manifest_path = temp_dir.path().join("staging/directory.json");
        shelve_manifest::save(&manifest, &manifest_path).unwrap();
        let payload = temp_dir.path().join("staging/data.tar.gz");
        fs::write(&payload, b"payload").unwrap();
        Staging { temp_dir, manifest: manifest_path, payload }
    }

    fn bundle(staging: &Staging) -> ArchiveBundle {
        let identity = ArchiveIdentity::derive(datetime!(2024-01-01 00:00), "");
        let classification = Classification {
            directory_path: "s3://bucket1/prefix/".to_string(),
            ..Classification::default()
        };
        ArchiveBundle::new(identity, &classification, &staging.manifest, &staging.payload)
    }

    #[test]
    fn test_save_lays_out_bundle() {
        let staging = staging();
        let root = staging.temp_dir.path().join("archives");
        let mut bundle = bundle(&staging);
        let directory = bundle.save(&root).unwrap();

        assert_eq!(directory, root.join("archive_202401010000"));
        assert_eq!(bundle.local_path(), Some(directory.as_path()));
        let mut names: Vec<String> = fs::read_dir(&directory)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["data.tar.gz", "directory.json", "metadata.json"]);
        assert!(!staging.manifest.exists());
        assert!(!staging.payload.exists());
        // No staged metadata left next to the bundle.
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
    }

    #[test]
    fn test_save_reads_size_from_manifest_document() {
        let staging = staging();
        let mut bundle = bundle(&staging);
        assert_eq!(bundle.metadata().size_bytes, None);
        let directory = bundle.save(staging.temp_dir.path()).unwrap();
        let metadata = ArchiveMetadata::read(&directory.join(METADATA_FILE)).unwrap();
        assert_eq!(metadata.size_bytes, Some(450));
        assert_eq!(metadata.id, "archive_202401010000");
        assert_eq!(metadata.directory_file, "directory.json");
        assert_eq!(metadata.data_file, "data.tar.gz");
    }

    #[test]
    fn test_save_twice_fails() {
        let staging = staging();
        let root = staging.temp_dir.path().join("archives");
        let mut bundle = bundle(&staging);
        bundle.save(&root).unwrap();
        let err = bundle.save(&root).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(..)));
    }

    #[test]
    fn test_existing_bundle_directory_is_reused() {
        let staging = staging();
        let root = staging.temp_dir.path().join("archives");
        fs::create_dir_all(root.join("archive_202401010000")).unwrap();
        bundle(&staging).save(&root).unwrap();
        assert!(root.join("archive_202401010000/metadata.json").is_file());
    }

    #[test]
    fn test_root_occupied_by_file() {
        let staging = staging();
        let root = staging.temp_dir.path().join("archives");
        fs::write(&root, b"not a directory").unwrap();
        let err = bundle(&staging).save(&root).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotADirectory(_)));
    }

    #[test]
    fn test_missing_payload() {
        let staging = staging();
        fs::remove_file(&staging.payload).unwrap();
        let err = bundle(&staging).save(staging.temp_dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(path, _) if path == &staging.payload));
    }

    #[test]
    fn test_missing_manifest_document() {
        let staging = staging();
        fs::remove_file(&staging.manifest).unwrap();
        let err = bundle(&staging).save(staging.temp_dir.path()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Manifest(_)));
    }

    #[test]
    fn test_in_memory_manifest_skips_parse() {
        let staging = staging();
        let manifest = DirectoryManifest::new("Finances", vec![], vec![], vec![]);
        // Document is corrupt, but the in-memory manifest is used instead.
        fs::write(&staging.manifest, b"garbage").unwrap();
        let mut bundle = bundle(&staging).with_manifest(manifest);
        bundle.save(staging.temp_dir.path()).unwrap();
        assert_eq!(bundle.metadata().size_bytes, None);
    }

    #[test]
    fn test_remote_path() {
        let staging = staging();
        assert_eq!(bundle(&staging).remote_path(), "s3://bucket1/prefix/archive_202401010000/");
    }
}
