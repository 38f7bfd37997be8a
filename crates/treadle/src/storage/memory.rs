//! In-memory storage for tests.
//!
//! Files live in a map guarded by a reader/writer lock shared with every
//! open handle, so writes through a handle are visible immediately.
//! Directories are implied by the files written beneath them.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{FileInfo, Storage, StorageFile, split_pattern};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl State {
    fn add_parents(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current.filter(|d| !d.as_os_str().is_empty()) {
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.as_os_str().is_empty()
            || self.dirs.contains(path)
            || self.files.keys().any(|file| file.starts_with(path) && file != path)
    }
}

/// [`Storage`] backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<State>>,
    counter: Arc<AtomicU64>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn poisoned() -> io::Error {
    io::Error::other("storage lock poisoned")
}

/// Drops `.` components so `./a.go` and `a.go` name the same file.
fn key(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

impl MemoryStorage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads files from a text bundle.
    ///
    /// Each file starts with a `# path` line; the lines up to the next
    /// marker are its content.
    ///
    /// ```text
    /// # models/user.go
    /// package models
    /// ```
    #[must_use]
    pub fn from_bundle(bundle: &str) -> Self {
        let storage = Self::new();
        if let Ok(mut state) = storage.state.write() {
            for (path, content) in parse_bundle(bundle) {
                state.add_parents(&path);
                state.files.insert(path, content.into_bytes());
            }
        }
        storage
    }

    /// Loads files from `(path, content)` pairs.
    #[must_use]
    pub fn with_files<P: AsRef<Path>, C: AsRef<str>>(files: impl IntoIterator<Item = (P, C)>) -> Self {
        let storage = Self::new();
        if let Ok(mut state) = storage.state.write() {
            for (path, content) in files {
                let file = key(path.as_ref());
                state.add_parents(&file);
                state.files.insert(file, content.as_ref().as_bytes().to_vec());
            }
        }
        storage
    }

    fn read(&self) -> io::Result<RwLockReadGuard<'_, State>> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> io::Result<RwLockWriteGuard<'_, State>> {
        self.state.write().map_err(|_| poisoned())
    }

    /// Returns every file as text, keyed by path.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        self.read()
            .map(|state| {
                state
                    .files
                    .iter()
                    .map(|(path, bytes)| (path.clone(), String::from_utf8_lossy(bytes).into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the content of one file as text.
    #[must_use]
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let file = key(path.as_ref());
        self.read().ok().and_then(|state| {
            state
                .files
                .get(&file)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        })
    }

    /// Renders every file in the bundle format accepted by
    /// [`MemoryStorage::from_bundle`], sorted by path.
    #[cfg(test)]
    pub(crate) fn to_bundle(&self) -> String {
        self.snapshot()
            .into_iter()
            .map(|(path, content)| format!("# {}\n{content}", path.display()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns whether storage holds exactly the files of `bundle`, comparing
    /// content with whitespace normalised.
    #[must_use]
    pub fn matches_bundle(&self, bundle: &str) -> bool {
        let expected: BTreeMap<PathBuf, String> = parse_bundle(bundle)
            .into_iter()
            .map(|(path, content)| (path, normalise_whitespace(&content)))
            .collect();
        let actual: BTreeMap<PathBuf, String> = self
            .snapshot()
            .into_iter()
            .map(|(path, content)| (path, normalise_whitespace(&content)))
            .collect();
        expected == actual
    }

    /// Returns the first file whose whitespace-normalised content contains
    /// the whitespace-normalised `expected` text.
    #[cfg(test)]
    pub(crate) fn file_containing(&self, expected: &str) -> Option<PathBuf> {
        let wanted = normalise_whitespace(expected);
        self.snapshot()
            .into_iter()
            .find(|(_, content)| normalise_whitespace(content).contains(&wanted))
            .map(|(path, _)| path)
    }
}

/// Trims every line, collapses runs of blanks and drops empty lines.
fn normalise_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_bundle(bundle: &str) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    let mut current: Option<(PathBuf, Vec<&str>)> = None;
    for line in bundle.split('\n') {
        if let Some(path) = line.strip_prefix("# ") {
            if let Some((file, lines)) = current.take() {
                files.push((file, lines.join("\n")));
            }
            current = Some((key(Path::new(path.trim())), Vec::new()));
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    if let Some((file, lines)) = current {
        files.push((file, lines.join("\n")));
    }
    files
}

/// A handle whose writes land in the shared map.
struct MemoryFile {
    path: PathBuf,
    state: Arc<RwLock<State>>,
    buffer: Cursor<Vec<u8>>,
}

impl Read for MemoryFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buffer.read(buf)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.buffer.write(buf)?;
        self.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state
            .files
            .insert(self.path.clone(), self.buffer.get_ref().clone());
        Ok(())
    }
}

impl MemoryStorage {
    fn handle(&self, path: PathBuf, content: Vec<u8>) -> Box<dyn StorageFile> {
        Box::new(MemoryFile {
            path,
            state: Arc::clone(&self.state),
            buffer: Cursor::new(content),
        })
    }
}

impl Storage for MemoryStorage {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.read()?
            .files
            .get(&key(path))
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    fn write_file(&self, path: &Path, contents: &[u8], _mode: u32) -> io::Result<()> {
        let file = key(path);
        let mut state = self.write()?;
        state.add_parents(&file);
        state.files.insert(file, contents.to_vec());
        Ok(())
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let file = key(path);
        let state = self.read()?;
        if let Some(bytes) = state.files.get(&file) {
            return Ok(FileInfo {
                len: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
                is_dir: false,
            });
        }
        if state.is_dir(&file) {
            return Ok(FileInfo {
                len: 0,
                is_dir: true,
            });
        }
        Err(not_found(path))
    }

    fn mkdir_all(&self, path: &Path, _mode: u32) -> io::Result<()> {
        let dir = key(path);
        let mut state = self.write()?;
        state.add_parents(&dir);
        if !dir.as_os_str().is_empty() {
            state.dirs.insert(dir);
        }
        Ok(())
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let file = key(path);
        let mut state = self.write()?;
        if state.files.remove(&file).is_some() || state.dirs.remove(&file) {
            return Ok(());
        }
        Err(not_found(path))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.write()?;
        let content = state.files.remove(&key(from)).ok_or_else(|| not_found(from))?;
        let target = key(to);
        state.add_parents(&target);
        state.files.insert(target, content);
        Ok(())
    }

    fn temp_file(&self, dir: &Path, pattern: &str) -> io::Result<(PathBuf, Box<dyn StorageFile>)> {
        let (prefix, suffix) = split_pattern(pattern);
        let token = self.counter.fetch_add(1, Ordering::Relaxed);
        let path = dir.join(format!("{prefix}{token}{suffix}"));
        let file = key(&path);
        {
            let mut state = self.write()?;
            state.add_parents(&file);
            state.files.insert(file.clone(), Vec::new());
        }
        Ok((path, self.handle(file, Vec::new())))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn StorageFile>> {
        let content = self.read_file(path)?;
        Ok(self.handle(key(path), content))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn StorageFile>> {
        self.write_file(path, &[], super::FILE_MODE)?;
        Ok(self.handle(key(path), Vec::new()))
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let wanted = key(dir);
        let state = self.read()?;
        if !state.is_dir(&wanted) {
            return Err(not_found(dir));
        }
        Ok(state
            .files
            .keys()
            .filter(|file| file.parent().unwrap_or_else(|| Path::new("")) == wanted)
            .filter_map(|file| file.file_name().map(|name| dir.join(name)))
            .collect())
    }
}
