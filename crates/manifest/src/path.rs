//! Identifier-to-path resolution for filesystem-backed tree sources.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalises a root-relative identifier into a relative path.
///
/// The empty identifier (and anything that normalises to nothing, like `.`)
/// refers to the root itself and yields an empty path. Identifiers may never
/// climb above the root.
///
/// ```text
/// "Finances/2024"       -> "Finances/2024"
/// "a/./b//c/"           -> "a/b/c"
/// "a/../b"              -> "b"
/// ""                    -> ""
/// "../etc"              -> InvalidPath
/// ```
pub(crate) fn normalize(id: impl AsRef<Path>) -> Result<PathBuf> {
    let id = id.as_ref();
    let mut components = Vec::new();
    for component in id.components() {
        match component {
            Component::Normal(segment) => {
                // Null bytes pass through Path::components() on Unix but
                // truncate in C-based syscalls.
                if segment.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidPath(id.to_path_buf()));
                }
                components.push(segment);
            },
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidPath(id.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidPath(id.to_path_buf()));
                }
            },
        }
    }
    Ok(components.into_iter().collect())
}

/// Turns an arbitrary remote name into a single safe path component.
///
/// Remote names may contain separators or be `.`/`..`; none of that is
/// allowed to shape the local download tree.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String =
        name.chars().map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c }).collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
