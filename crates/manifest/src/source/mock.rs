//! In-memory tree source for testing.

use crate::error::{ErrorKind, Result};
use crate::models::{FileRef, FolderRef};
use crate::source::{FileFetcher, TreeSource};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::fs;

#[derive(Default)]
struct MockFolder {
    folder: Option<FolderRef>,
    children: Vec<String>,
    native: Vec<FileRef>,
    non_native: Vec<FileRef>,
}

/// In-memory [`TreeSource`] and [`FileFetcher`] for testing.
///
/// The tree is declared up-front with builder methods; children keep their
/// declaration order. Listing a folder registered with
/// [`failing_folder()`](Self::failing_folder) fails with a lookup error, and
/// fetching a file registered with [`failing_file()`](Self::failing_file)
/// fails with a transfer error. Calls are counted so tests can assert which
/// collaborators were exercised.
///
/// # Examples
///
/// ```ignore
/// use shelve_manifest::{FileRef, source::MockTree};
///
/// let tree = MockTree::with_root("root", "Finances")
///     .with_folder("root", "sub", "2024")
///     .with_file("sub", FileRef::new("f1", "q1.pdf", "application/pdf").with_size(100), b"...");
/// ```
pub struct MockTree {
    name: String,
    folders: HashMap<String, MockFolder>,
    contents: HashMap<String, Vec<u8>>,
    failing_folders: HashSet<String>,
    failing_files: HashSet<String>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl MockTree {
    /// Create a mock tree containing only a root folder.
    pub fn with_root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let mut folders = HashMap::new();
        folders.insert(id.clone(), MockFolder {
            folder: Some(FolderRef::new(id, name)),
            ..MockFolder::default()
        });
        Self {
            name: "mock".to_string(),
            folders,
            contents: HashMap::new(),
            failing_folders: HashSet::new(),
            failing_files: HashSet::new(),
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Add a subfolder beneath an already declared folder.
    ///
    /// Panics if the parent hasn't been declared. If test setup is wrong,
    /// then test should not pass.
    pub fn with_folder(mut self, parent: &str, id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        self.parent_mut(parent).children.push(id.clone());
        self.folders.insert(id.clone(), MockFolder {
            folder: Some(FolderRef::new(id, name)),
            ..MockFolder::default()
        });
        self
    }

    /// Add a downloadable file with its contents.
    pub fn with_file(mut self, folder: &str, file: FileRef, data: impl Into<Vec<u8>>) -> Self {
        self.contents.insert(file.id.clone(), data.into());
        self.parent_mut(folder).non_native.push(file);
        self
    }

    /// Add a native (non-downloadable) file.
    pub fn with_native_file(mut self, folder: &str, file: FileRef) -> Self {
        self.parent_mut(folder).native.push(file);
        self
    }

    /// Make every listing call on this folder fail.
    pub fn failing_folder(mut self, id: impl Into<String>) -> Self {
        self.failing_folders.insert(id.into());
        self
    }

    /// Make fetching this file fail.
    pub fn failing_file(mut self, id: impl Into<String>) -> Self {
        self.failing_files.insert(id.into());
        self
    }

    /// Change the name of the mock source.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reference to a declared folder.
    pub fn folder(&self, id: &str) -> Option<FolderRef> {
        self.folders.get(id).and_then(|f| f.folder.clone())
    }

    /// Number of listing calls made so far (all three kinds combined).
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of fetch calls made so far, including failed ones.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    fn parent_mut(&mut self, id: &str) -> &mut MockFolder {
        match self.folders.get_mut(id) {
            Some(folder) => folder,
            None => panic!("MockTree: undeclared folder {id}"),
        }
    }

    fn lookup(&self, folder: &FolderRef) -> Result<&MockFolder> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_folders.contains(&folder.id) {
            exn::bail!(ErrorKind::Lookup(folder.name.clone()));
        }
        self.folders.get(&folder.id).ok_or_else(|| exn::Exn::from(ErrorKind::Lookup(folder.name.clone())))
    }
}

#[async_trait]
impl TreeSource for MockTree {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find_folder(&self, name: &str) -> Result<Option<FolderRef>> {
        let mut matches: Vec<&FolderRef> =
            self.folders.values().filter_map(|f| f.folder.as_ref()).filter(|f| f.name == name).collect();
        // HashMap order is arbitrary; keep the answer stable.
        matches.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matches.first().map(|f| (*f).clone()))
    }

    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>> {
        let entry = self.lookup(folder)?;
        Ok(entry.children.iter().filter_map(|id| self.folder(id)).collect())
    }

    async fn list_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>> {
        Ok(self.lookup(folder)?.native.clone())
    }

    async fn list_non_native_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>> {
        Ok(self.lookup(folder)?.non_native.clone())
    }
}

#[async_trait]
impl FileFetcher for MockTree {
    async fn fetch_file(&self, file: &FileRef, destination: &Path) -> Result<u64> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_files.contains(&file.id) {
            exn::bail!(ErrorKind::Transfer(file.name.clone()));
        }
        let data = self.contents.get(&file.id).ok_or_else(|| exn::Exn::from(ErrorKind::Transfer(file.name.clone())))?;
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
        }
        fs::write(destination, data).await.map_err(ErrorKind::Io)?;
        Ok(data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> MockTree {
        MockTree::with_root("root", "Root")
            .with_folder("root", "a", "A")
            .with_folder("root", "b", "B")
            .with_file("a", FileRef::new("f1", "one.txt", "text/plain").with_size(3), b"one".to_vec())
            .with_native_file("b", FileRef::new("n1", "doc", "application/vnd.google-apps.document"))
    }

    #[tokio::test]
    async fn test_children_keep_declaration_order() {
        let tree = tree();
        let root = tree.folder("root").unwrap();
        let names: Vec<_> = tree.list_subfolders(&root).await.unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(tree.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_find_folder() {
        let tree = tree();
        assert_eq!(tree.find_folder("B").await.unwrap(), Some(FolderRef::new("b", "B")));
        assert_eq!(tree.find_folder("C").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failing_folder() {
        let tree = tree().failing_folder("a");
        let a = tree.folder("a").unwrap();
        let err = tree.list_non_native_files(&a).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Lookup(name) if name == "A"));
    }

    #[tokio::test]
    async fn test_fetch_and_failing_file() {
        let tree = tree().failing_file("f1");
        let temp_dir = tempfile::tempdir().unwrap();
        let file = FileRef::new("f1", "one.txt", "text/plain");
        let err = tree.fetch_file(&file, &temp_dir.path().join("one.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Transfer(_)));
        assert_eq!(tree.fetch_calls(), 1);

        let ok_tree = self::tree();
        let written = ok_tree.fetch_file(&file, &temp_dir.path().join("x/one.txt")).await.unwrap();
        assert_eq!(written, 3);
    }

    #[test]
    #[should_panic(expected = "undeclared folder")]
    fn test_undeclared_parent_panics() {
        let _ = MockTree::with_root("root", "Root").with_folder("nope", "x", "X");
    }
}
