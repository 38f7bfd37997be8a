//! The narrow I/O contract the engine persists through.
//!
//! Two backends satisfy it: [`LocalStorage`] on a real directory and
//! [`MemoryStorage`] for tests. Both report absent paths as
//! [`io::ErrorKind::NotFound`].

mod local;
mod memory;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub use local::LocalStorage;
pub use memory::MemoryStorage;

use crate::error::{Error, Result};

/// Default permission bits for files the engine writes.
pub const FILE_MODE: u32 = 0o644;

/// Default permission bits for directories the engine creates.
pub const DIR_MODE: u32 = 0o755;

/// An open file handle.
pub trait StorageFile: Read + Write + Send {}

impl<T: Read + Write + Send> StorageFile for T {}

/// Metadata returned by [`Storage::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Length in bytes; zero for directories.
    pub len: u64,
    /// Whether the path is a directory.
    pub is_dir: bool,
}

/// File operations the engine needs.
pub trait Storage: Send + Sync {
    /// Reads a whole file.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when the file does not exist.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes a whole file, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()>;

    /// Returns metadata for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when nothing exists at `path`.
    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    /// Creates `path` and every missing parent.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// Removes a file or an empty directory.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when nothing exists at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Moves `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when `from` does not exist.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Creates a new empty file in `dir` whose name matches `pattern`; a `*`
    /// in the pattern is replaced by a unique token.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn temp_file(&self, dir: &Path, pattern: &str) -> io::Result<(PathBuf, Box<dyn StorageFile>)>;

    /// Opens an existing file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when the file does not exist.
    fn open(&self, path: &Path) -> io::Result<Box<dyn StorageFile>>;

    /// Creates or truncates a file and opens it for writing.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn create(&self, path: &Path) -> io::Result<Box<dyn StorageFile>>;

    /// Lists the files directly inside `dir`, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when `dir` does not exist.
    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Returns whether anything exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns I/O errors other than [`io::ErrorKind::NotFound`].
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Splits a temp-file pattern at its `*` into prefix and suffix.
pub(crate) fn split_pattern(pattern: &str) -> (&str, &str) {
    pattern.split_once('*').unwrap_or((pattern, ""))
}

/// Reads `path` as UTF-8, mapping absence to `None`.
pub(crate) fn read_optional(storage: &dyn Storage, path: &Path) -> Result<Option<String>> {
    match storage.read_file(path) {
        Ok(bytes) => String::from_utf8(bytes).map(Some).map_err(|err| {
            Error::storage(
                "read",
                path,
                io::Error::new(io::ErrorKind::InvalidData, err),
            )
        }),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::storage("read", path, err)),
    }
}
