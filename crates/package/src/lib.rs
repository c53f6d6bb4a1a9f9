//! Payload packaging.
//!
//! Packs a local directory tree (the downloaded contents of a folder
//! snapshot) into a single tar payload file, compressed with the configured
//! [`Compression`]. Entries are added in name order with root-relative paths,
//! so the same tree always produces the same entry list.
//!
//! On failure the partially written payload is removed; a payload file only
//! exists if packaging succeeded.

mod compression;
pub mod error;

pub use crate::compression::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// A successfully written payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub path: PathBuf,
    /// Number of regular files packed.
    pub files: u64,
    /// Uncompressed size of the packed files.
    pub bytes: u64,
}

#[derive(Default)]
struct Tally {
    files: u64,
    bytes: u64,
}

/// Packs directories into compressed tar payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Packager {
    compression: Compression,
}

impl Packager {
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Payload filename for a given stem, e.g. `data` becomes `data.tar.gz`.
    pub fn payload_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.compression.extension())
    }

    /// Pack everything beneath `source` into a payload file at `destination`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shelve_package::{Compression, Packager};
    /// use std::path::Path;
    ///
    /// let packager = Packager::new(Compression::Gzip);
    /// let payload = packager.pack(Path::new("/tmp/download"), Path::new("/tmp/data.tar.gz")).unwrap();
    /// println!("{} files, {} bytes", payload.files, payload.bytes);
    /// ```
    #[instrument(skip(self), fields(compression = %self.compression))]
    pub fn pack(&self, source: &Path, destination: &Path) -> Result<Payload> {
        if !source.is_dir() {
            exn::bail!(ErrorKind::NotADirectory(source.to_path_buf()));
        }
        match self.pack_inner(source, destination) {
            Ok(tally) => {
                tracing::info!(files = tally.files, bytes = tally.bytes, "Packed payload");
                Ok(Payload {
                    path: destination.to_path_buf(),
                    files: tally.files,
                    bytes: tally.bytes,
                })
            },
            Err(e) => {
                // Never leave a truncated payload behind.
                _ = fs::remove_file(destination);
                Err(e)
            },
        }
    }

    fn pack_inner(&self, source: &Path, destination: &Path) -> Result<Tally> {
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).or_raise(|| ErrorKind::Io)?;
        }
        let file = File::create(destination).or_raise(|| ErrorKind::Io)?;
        let mut builder = tar::Builder::new(self.compression.encoder(BufWriter::new(file)));
        let mut tally = Tally::default();
        append_tree(&mut builder, source, Path::new(""), &mut tally)?;
        let encoder = builder.into_inner().or_raise(|| ErrorKind::Io)?;
        let mut writer = encoder.finish().or_raise(|| ErrorKind::Io)?;
        writer.flush().or_raise(|| ErrorKind::Io)?;
        Ok(tally)
    }

    /// Relative paths of the regular files inside a payload, in archive order.
    pub fn entries(&self, payload: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(payload).or_raise(|| ErrorKind::Io)?;
        let mut archive = tar::Archive::new(self.compression.wrap_reader(BufReader::new(file)));
        let mut paths = Vec::new();
        for entry in archive.entries().or_raise(|| ErrorKind::Io)? {
            let entry = entry.or_raise(|| ErrorKind::Io)?;
            if entry.header().entry_type().is_file() {
                paths.push(entry.path().or_raise(|| ErrorKind::Io)?.into_owned());
            }
        }
        Ok(paths)
    }
}

fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    directory: &Path,
    relative: &Path,
    tally: &mut Tally,
) -> Result<()> {
    let mut entries = fs::read_dir(directory)
        .or_raise(|| ErrorKind::Entry(directory.to_path_buf()))?
        .collect::<std::io::Result<Vec<_>>>()
        .or_raise(|| ErrorKind::Entry(directory.to_path_buf()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let name = relative.join(entry.file_name());
        let metadata = entry.metadata().or_raise(|| ErrorKind::Entry(path.clone()))?;
        if metadata.is_dir() {
            builder.append_dir(&name, &path).or_raise(|| ErrorKind::Entry(path.clone()))?;
            append_tree(builder, &path, &name, tally)?;
        } else if metadata.is_file() {
            builder.append_path_with_name(&path, &name).or_raise(|| ErrorKind::Entry(path.clone()))?;
            tally.files += 1;
            tally.bytes += metadata.len();
        }
    }
    Ok(())
}
