//! Local filesystem tree source.
//!
//! Treats a directory on disk as the remote file store. This is what a synced
//! Google Drive folder looks like on a desktop: ordinary files alongside small
//! `.gdoc`/`.gsheet`/... shortcut files standing in for native documents.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRef, FolderRef};
use crate::path::normalize;
use crate::source::{FileFetcher, TreeSource};
use async_trait::async_trait;
use exn::ResultExt;
use std::collections::VecDeque;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;

/// Shortcut extensions that stand in for native documents, and the mime type
/// the remote service reports for each.
const NATIVE_TYPES: [(&str, &str); 8] = [
    ("gdoc", "application/vnd.google-apps.document"),
    ("gsheet", "application/vnd.google-apps.spreadsheet"),
    ("gslides", "application/vnd.google-apps.presentation"),
    ("gdraw", "application/vnd.google-apps.drawing"),
    ("gform", "application/vnd.google-apps.form"),
    ("gmap", "application/vnd.google-apps.map"),
    ("gsite", "application/vnd.google-apps.site"),
    ("gjam", "application/vnd.google-apps.jam"),
];
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

enum Entry {
    Folder(FolderRef),
    Native(FileRef),
    NonNative(FileRef),
}

/// Directory-backed [`TreeSource`] and [`FileFetcher`].
///
/// Folder and file ids are paths relative to the root, with the root itself
/// identified by the empty string. Children are listed in name order.
///
/// # Examples
///
/// ```no_run
/// use shelve_manifest::{ManifestBuilder, source::LocalTree};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tree = LocalTree::new("drive", "/home/me/Google Drive")?;
/// let manifest = ManifestBuilder::new(&tree).build(&tree.root()).await?;
/// println!("{} bytes", manifest.aggregated_size_bytes().unwrap_or(0));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LocalTree {
    name: String,
    root: PathBuf,
}

impl LocalTree {
    /// Create a tree source rooted at an existing, absolute directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() || !root.is_dir() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        Ok(Self { name: name.into(), root })
    }

    /// Reference to the root folder itself.
    pub fn root(&self) -> FolderRef {
        let name = self.root.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        FolderRef::new("", name)
    }

    fn absolute_path(&self, id: &str) -> Result<PathBuf> {
        Ok(self.root.join(normalize(id)?))
    }

    fn child_id(parent: &str, name: &str) -> String {
        match parent.trim_end_matches('/') {
            "" => name.to_string(),
            parent => format!("{parent}/{name}"),
        }
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::InvalidPath(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    fn native_mime_type(name: &str) -> Option<&'static str> {
        let extension = Path::new(name).extension()?.to_str()?.to_lowercase();
        NATIVE_TYPES.iter().find(|(ext, _)| *ext == extension).map(|(_, mime)| *mime)
    }

    fn mime_type(name: &str) -> &'static str {
        let extension = Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_lowercase);
        match extension.as_deref() {
            Some("txt") => "text/plain",
            Some("csv") => "text/csv",
            Some("html" | "htm") => "text/html",
            Some("json") => "application/json",
            Some("pdf") => "application/pdf",
            Some("zip") => "application/zip",
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => DEFAULT_MIME_TYPE,
        }
    }

    fn modified(metadata: &Metadata) -> Option<OffsetDateTime> {
        metadata.modified().ok().map(OffsetDateTime::from)
    }

    /// Read and classify the direct children of a folder, sorted by name.
    async fn children(&self, folder: &FolderRef) -> Result<Vec<Entry>> {
        let directory = self.absolute_path(&folder.id)?;
        let mut reader = fs::read_dir(&directory).await.map_err(|e| Self::map_io_error(e, &directory))?;
        let mut found = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(|e| Self::map_io_error(e, &directory))? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            // Symlinks are followed; dangling ones are skipped.
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "Skipping dangling symlink");
                    continue;
                },
                Err(e) => exn::bail!(Self::map_io_error(e, &path)),
            };
            found.push((name, metadata));
        }
        found.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(found
            .into_iter()
            .filter_map(|(name, metadata)| {
                let id = Self::child_id(&folder.id, &name);
                if metadata.is_dir() {
                    return Some(Entry::Folder(FolderRef::new(id, name)));
                }
                if !metadata.is_file() {
                    tracing::debug!(folder = %folder.id, name = %name, "Skipping special file");
                    return None;
                }
                let modified = Self::modified(&metadata);
                Some(match Self::native_mime_type(&name) {
                    // Shortcut files are a few bytes of JSON pointing at the
                    // real document; their size says nothing about it.
                    Some(mime) => {
                        let file = FileRef::new(id, name, mime);
                        Entry::Native(match modified {
                            Some(modified) => file.with_last_modified(modified),
                            None => file,
                        })
                    },
                    None => {
                        let mime = Self::mime_type(&name);
                        let file = FileRef::new(id, name, mime).with_size(metadata.len());
                        Entry::NonNative(match modified {
                            Some(modified) => file.with_last_modified(modified),
                            None => file,
                        })
                    },
                })
            })
            .collect())
    }
}

#[async_trait]
impl TreeSource for LocalTree {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_folder(&self, name: &str) -> Result<Option<FolderRef>> {
        let root = self.root();
        if root.name == name {
            return Ok(Some(root));
        }
        // Breadth-first, so the shallowest match wins.
        let mut queue = VecDeque::from([root]);
        while let Some(folder) = queue.pop_front() {
            for child in self.list_subfolders(&folder).await? {
                if child.name == name {
                    return Ok(Some(child));
                }
                queue.push_back(child);
            }
        }
        Ok(None)
    }

    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>> {
        let entries = self.children(folder).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Folder(folder) => Some(folder),
                _ => None,
            })
            .collect())
    }

    async fn list_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>> {
        let entries = self.children(folder).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Native(file) => Some(file),
                _ => None,
            })
            .collect())
    }

    async fn list_non_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>> {
        let entries = self.children(folder).await?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::NonNative(file) => Some(file),
                _ => None,
            })
            .collect())
    }
}

#[async_trait]
impl FileFetcher for LocalTree {
    async fn fetch_file(&self, file: &FileRef, destination: &Path) -> Result<u64> {
        let source = self.absolute_path(&file.id).or_raise(|| ErrorKind::Transfer(file.name.clone()))?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(ErrorKind::Io)
                .or_raise(|| ErrorKind::Transfer(file.name.clone()))?;
        }
        let written = fs::copy(&source, destination)
            .await
            .map_err(|e| Self::map_io_error(e, &source))
            .or_raise(|| ErrorKind::Transfer(file.name.clone()))?;
        tracing::debug!(file = %file.name, bytes = written, "Fetched file from local tree");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as sync_fs;

    fn fixture() -> (tempfile::TempDir, LocalTree) {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        sync_fs::create_dir_all(root.join("Finances/2024")).unwrap();
        sync_fs::write(root.join("Finances/budget.csv"), b"a,b,c").unwrap();
        sync_fs::write(root.join("Finances/notes.gdoc"), b"{\"doc_id\":\"abc\"}").unwrap();
        sync_fs::write(root.join("Finances/2024/q1.pdf"), vec![0u8; 300]).unwrap();
        sync_fs::write(root.join("readme.txt"), b"hello").unwrap();
        let tree = LocalTree::new("local", root).unwrap();
        (temp_dir, tree)
    }

    #[test]
    fn test_new_requires_existing_absolute_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalTree::new("local", temp_dir.path()).is_ok());
        assert!(LocalTree::new("local", "relative/path").is_err());
        assert!(LocalTree::new("local", temp_dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_child_id() {
        assert_eq!(LocalTree::child_id("", "Finances"), "Finances");
        assert_eq!(LocalTree::child_id("Finances", "2024"), "Finances/2024");
        assert_eq!(LocalTree::child_id("Finances/", "2024"), "Finances/2024");
    }

    #[tokio::test]
    async fn test_partitions_children() {
        let (_temp_dir, tree) = fixture();
        let finances = FolderRef::new("Finances", "Finances");
        let folders = tree.list_subfolders(&finances).await.unwrap();
        assert_eq!(folders, vec![FolderRef::new("Finances/2024", "2024")]);

        let native = tree.list_native_files(&finances).await.unwrap();
        assert_eq!(native.len(), 1);
        assert_eq!(native[0].name, "notes.gdoc");
        assert_eq!(native[0].mime_type, "application/vnd.google-apps.document");
        assert_eq!(native[0].size_bytes, None);
        assert!(native[0].last_modified.is_some());

        let files = tree.list_non_native_files(&finances).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, "Finances/budget.csv");
        assert_eq!(files[0].mime_type, "text/csv");
        assert_eq!(files[0].size_bytes, Some(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_followed() {
        let (temp_dir, tree) = fixture();
        let root = temp_dir.path();
        std::os::unix::fs::symlink(root.join("readme.txt"), root.join("Finances/linked.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("Finances/2024"), root.join("Finances/linked_dir")).unwrap();
        std::os::unix::fs::symlink(root.join("nowhere.txt"), root.join("Finances/dangling.txt")).unwrap();
        let finances = FolderRef::new("Finances", "Finances");

        let files = tree.list_non_native_files(&finances).await.unwrap();
        let linked = files.iter().find(|f| f.name == "linked.txt").unwrap();
        assert_eq!(linked.size_bytes, Some(5));
        assert!(files.iter().all(|f| f.name != "dangling.txt"));

        let folders = tree.list_subfolders(&finances).await.unwrap();
        assert!(folders.contains(&FolderRef::new("Finances/linked_dir", "linked_dir")));
    }

    #[tokio::test]
    async fn test_find_folder() {
        let (_temp_dir, tree) = fixture();
        let found = tree.find_folder("2024").await.unwrap().unwrap();
        assert_eq!(found.id, "Finances/2024");
        assert!(tree.find_folder("Nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_listing_missing_folder_fails() {
        let (_temp_dir, tree) = fixture();
        let missing = FolderRef::new("Missing", "Missing");
        assert!(tree.list_subfolders(&missing).await.is_err());
        let escaping = FolderRef::new("../outside", "outside");
        assert!(tree.list_subfolders(&escaping).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_file() {
        let (_temp_dir, tree) = fixture();
        let target_dir = tempfile::tempdir().unwrap();
        let file = FileRef::new("Finances/2024/q1.pdf", "q1.pdf", "application/pdf");
        let destination = target_dir.path().join("nested/q1.pdf");
        let written = tree.fetch_file(&file, &destination).await.unwrap();
        assert_eq!(written, 300);
        assert_eq!(sync_fs::read(&destination).unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_fetch_missing_file_is_transfer_error() {
        let (_temp_dir, tree) = fixture();
        let target_dir = tempfile::tempdir().unwrap();
        let file = FileRef::new("Finances/gone.pdf", "gone.pdf", "application/pdf");
        let err = tree.fetch_file(&file, &target_dir.path().join("gone.pdf")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transfer(name) if name == "gone.pdf"));
    }
}
