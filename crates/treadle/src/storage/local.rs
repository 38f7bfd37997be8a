//! Storage on a real directory tree.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use super::{FILE_MODE, FileInfo, Storage, StorageFile, split_pattern};

/// [`Storage`] rooted at a directory; relative paths resolve against it.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Creates storage rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
        let target = self.resolve(path);
        fs::write(&target, contents)?;
        set_mode(&target, mode)
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::metadata(self.resolve(path))?;
        Ok(FileInfo {
            len: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
        })
    }

    fn mkdir_all(&self, path: &Path, mode: u32) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(mode);
        }
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(self.resolve(path))
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let target = self.resolve(path);
        if fs::symlink_metadata(&target)?.is_dir() {
            fs::remove_dir(target)
        } else {
            fs::remove_file(target)
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(self.resolve(from), self.resolve(to))
    }

    fn temp_file(&self, dir: &Path, pattern: &str) -> io::Result<(PathBuf, Box<dyn StorageFile>)> {
        let (prefix, suffix) = split_pattern(pattern);
        let named = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(self.resolve(dir))?;
        // Staged files become targets and take the regular file mode.
        set_file_mode(named.as_file(), FILE_MODE)?;
        let (file, resolved) = named.keep().map_err(|err| err.error)?;
        let name = resolved
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| io::Error::other("temporary file has no name"))?;
        Ok((dir.join(name), Box::new(file)))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn StorageFile>> {
        let file = OpenOptions::new().read(true).open(self.resolve(path))?;
        Ok(Box::new(file))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn StorageFile>> {
        let file = File::create(self.resolve(path))?;
        Ok(Box::new(file))
    }

    fn read_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut names = Vec::new();
        for listed in fs::read_dir(self.resolve(dir))? {
            let entry = listed?;
            if entry.file_type()?.is_file() {
                names.push(dir.join(entry.file_name()));
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    #[rstest]
    fn relative_paths_resolve_against_root(dir: TempDir) {
        let storage = LocalStorage::new(dir.path());
        storage
            .write_file(Path::new("a.go"), b"package a\n", 0o644)
            .expect("write");
        assert!(dir.path().join("a.go").exists());
        assert_eq!(storage.read_file(Path::new("a.go")).expect("read"), b"package a\n");
    }

    #[rstest]
    fn missing_files_report_not_found(dir: TempDir) {
        let storage = LocalStorage::new(dir.path());
        for err in [
            storage.read_file(Path::new("nope.go")).expect_err("read"),
            storage.stat(Path::new("nope.go")).expect_err("stat"),
            storage.remove(Path::new("nope.go")).expect_err("remove"),
            storage
                .rename(Path::new("nope.go"), Path::new("other.go"))
                .expect_err("rename"),
        ] {
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }
    }

    #[rstest]
    fn temp_files_follow_the_pattern(dir: TempDir) {
        let storage = LocalStorage::new(dir.path());
        storage.mkdir_all(Path::new("pkg"), 0o755).expect("mkdir");
        let (path, mut handle) = storage
            .temp_file(Path::new("pkg"), ".treadle-*.go")
            .expect("temp");
        handle.write_all(b"package pkg\n").expect("write");
        drop(handle);
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with(".treadle-") && name.ends_with(".go"));
        assert_eq!(path.parent(), Some(Path::new("pkg")));
        assert_eq!(storage.read_file(&path).expect("read"), b"package pkg\n");
    }

    #[rstest]
    fn read_dir_lists_sorted_files_only(dir: TempDir) {
        let storage = LocalStorage::new(dir.path());
        storage.write_file(Path::new("b.go"), b"", 0o644).expect("b");
        storage.write_file(Path::new("a.go"), b"", 0o644).expect("a");
        storage.mkdir_all(Path::new("sub"), 0o755).expect("sub");
        assert_eq!(
            storage.read_dir(Path::new("")).expect("list"),
            vec![PathBuf::from("a.go"), PathBuf::from("b.go")]
        );
    }

    #[rstest]
    fn handles_read_and_write(dir: TempDir) {
        let storage = LocalStorage::new(dir.path());
        let mut created = storage.create(Path::new("x.txt")).expect("create");
        created.write_all(b"hello").expect("write");
        drop(created);
        let mut text = String::new();
        storage
            .open(Path::new("x.txt"))
            .expect("open")
            .read_to_string(&mut text)
            .expect("read");
        assert_eq!(text, "hello");
    }

    #[cfg(unix)]
    #[rstest]
    fn staged_files_carry_the_default_mode(dir: TempDir) {
        use std::os::unix::fs::PermissionsExt;

        let storage = LocalStorage::new(dir.path());
        let (path, handle) = storage.temp_file(Path::new(""), ".treadle-*.go").expect("temp");
        drop(handle);
        let mode = fs::metadata(dir.path().join(&path))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, FILE_MODE);
    }
}
