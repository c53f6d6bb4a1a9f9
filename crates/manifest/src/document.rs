//! Manifest document persistence.

use crate::error::{ErrorKind, Result};
use crate::models::DirectoryManifest;
use exn::ResultExt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::instrument;

/// Write a manifest to `path` as a pretty-printed JSON document.
///
/// Parent directories are created as needed and an existing document is
/// overwritten.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn save(manifest: &DirectoryManifest, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(ErrorKind::Io)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(ErrorKind::Io)?);
    serde_json::to_writer_pretty(&mut writer, manifest).or_raise(|| ErrorKind::Document(path.to_path_buf()))?;
    writer.flush().map_err(ErrorKind::Io)?;
    Ok(())
}

/// Parse a manifest document previously written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<DirectoryManifest> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path).map_err(ErrorKind::Io)?);
    serde_json::from_reader(reader).or_raise(|| ErrorKind::Document(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRef;
    use time::macros::datetime;

    fn manifest() -> DirectoryManifest {
        let pdf = FileRef::new("f1", "q1.pdf", "application/pdf")
            .with_size(300)
            .with_last_modified(datetime!(2024-02-01 09:00 UTC));
        let doc = FileRef::new("n1", "plan", "application/vnd.google-apps.document");
        let sub = DirectoryManifest::new("2024", vec![doc], vec![pdf], vec![]);
        DirectoryManifest::new("Finances", vec![], vec![], vec![sub])
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/directory.json");
        let original = manifest();
        save(&original, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, original);
        assert_eq!(loaded.aggregated_size_bytes(), Some(300));
    }

    #[test]
    fn test_load_missing_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = load(temp_dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io(_)));
    }

    #[test]
    fn test_load_malformed_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("directory.json");
        fs::write(&path, b"{\"name\": 12}").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Document(_)));
    }
}
