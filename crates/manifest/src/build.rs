use crate::error::{ErrorKind, Result};
use crate::models::{DirectoryManifest, FolderRef};
use crate::source::TreeSource;
use exn::{OptionExt, ResultExt};
use std::future::Future;
use std::pin::Pin;
use tracing::instrument;

type ManifestFuture<'b> = Pin<Box<dyn Future<Output = Result<DirectoryManifest>> + Send + 'b>>;

/// Recursively walks a [`TreeSource`] and assembles a [`DirectoryManifest`].
///
/// The walk is depth-first and strictly sequential: every listing call is
/// awaited before the next one is made. A listing failure anywhere in the
/// tree fails the whole build; no partial manifest is ever returned.
///
/// Native files are only listed (and therefore only counted towards the
/// aggregates) when [`include_native()`](Self::include_native) is enabled.
///
/// # Examples
///
/// ```
/// use shelve_manifest::{ManifestBuilder, TreeSource, error::Result};
///
/// async fn total_size(source: &dyn TreeSource, folder: &str) -> Result<u64> {
///     let manifest = ManifestBuilder::new(source).build_named(folder).await?;
///     Ok(manifest.aggregated_size_bytes().unwrap_or(0))
/// }
/// ```
#[derive(Clone, Copy)]
pub struct ManifestBuilder<'a> {
    source: &'a dyn TreeSource,
    include_native: bool,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(source: &'a dyn TreeSource) -> Self {
        Self { source, include_native: false }
    }

    pub fn include_native(mut self, include: bool) -> Self {
        self.include_native = include;
        self
    }

    /// Build the manifest of the tree rooted at `folder`.
    #[instrument(skip(self), fields(source = self.source.name(), folder = %folder.name))]
    pub async fn build(&self, folder: &FolderRef) -> Result<DirectoryManifest> {
        let manifest = self.build_folder(folder).await?;
        tracing::info!(
            files = manifest.file_count(),
            size = manifest.aggregated_size_bytes(),
            "Built directory manifest"
        );
        Ok(manifest)
    }

    /// Resolve a folder by name, then build its manifest.
    ///
    /// A name that matches no folder is a
    /// [`FolderNotFound`](ErrorKind::FolderNotFound) lookup error.
    pub async fn build_named(&self, name: &str) -> Result<DirectoryManifest> {
        let folder = self
            .source
            .find_folder(name)
            .await
            .or_raise(|| ErrorKind::Lookup(name.to_string()))?
            .ok_or_raise(|| ErrorKind::FolderNotFound(name.to_string()))?;
        self.build(&folder).await
    }

    // Boxed so the recursion has a nameable (and Send) future type.
    fn build_folder<'b>(&'b self, folder: &'b FolderRef) -> ManifestFuture<'b> {
        Box::pin(async move {
            let lookup = || ErrorKind::Lookup(folder.name.clone());
            let children = self.source.list_subfolders(folder).await.or_raise(lookup)?;
            let native_files = match self.include_native {
                true => self.source.list_native_files(folder).await.or_raise(lookup)?,
                false => Vec::new(),
            };
            let non_native_files = self.source.list_non_native_files(folder).await.or_raise(lookup)?;

            let mut subfolders = Vec::with_capacity(children.len());
            for child in &children {
                subfolders.push(self.build_folder(child).await?);
            }
            tracing::debug!(
                folder = %folder.name,
                subfolders = subfolders.len(),
                native = native_files.len(),
                non_native = non_native_files.len(),
                "Listed folder"
            );
            Ok(DirectoryManifest::new(folder.name.clone(), native_files, non_native_files, subfolders))
        })
    }
}
