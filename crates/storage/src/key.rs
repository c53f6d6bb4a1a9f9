//! Object key validation.
//!
//! Keys are addressed the same way on every store: `/`-separated segments,
//! relative to the bucket. Validation prevents a key from escaping the bucket
//! on stores that map keys onto a filesystem.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes an object key.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and a
/// key that would leave the bucket (or normalizes to nothing) is rejected.
/// Null bytes and backslashes are rejected outright.
///
/// # Examples
///
/// ```
/// use shelve_storage::validate_key;
/// assert_eq!(validate_key("prefix//archive_202401010000/./data.tar.gz").unwrap(), "prefix/archive_202401010000/data.tar.gz");
/// assert_eq!(validate_key("/a/b/../c/").unwrap(), "a/c");
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a\0b").is_err());
/// ```
pub fn validate(key: &str) -> Result<String> {
    if key.contains(['\0', '\\']) {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            segment => segments.push(segment),
        }
    }
    match segments.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_string())),
        false => Ok(segments.join("/")),
    }
}

/// Join key parts with exactly one `/` between them, ignoring empty parts.
///
/// ```
/// use shelve_storage::join_key;
/// assert_eq!(join_key(["backups/", "archive_202401010000", "metadata.json"]), "backups/archive_202401010000/metadata.json");
/// assert_eq!(join_key(["", "archive_202401010000", "metadata.json"]), "archive_202401010000/metadata.json");
/// ```
pub fn join_key<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
