//! The filesystem and in-memory backends honour the same contract.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use rstest::rstest;
use tempfile::TempDir;
use treadle::storage::{DIR_MODE, FILE_MODE, LocalStorage, MemoryStorage, Storage};

enum Backend {
    Local(LocalStorage, TempDir),
    Memory(MemoryStorage),
}

impl Backend {
    fn local() -> Self {
        let dir = TempDir::new().expect("temp dir");
        Self::Local(LocalStorage::new(dir.path()), dir)
    }

    fn memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    fn storage(&self) -> &dyn Storage {
        match self {
            Self::Local(storage, _) => storage,
            Self::Memory(storage) => storage,
        }
    }
}

#[rstest]
#[case::local(Backend::local())]
#[case::memory(Backend::memory())]
fn absence_is_not_found(#[case] backend: Backend) {
    let storage = backend.storage();
    let missing = Path::new("missing.go");
    let kinds = [
        storage.read_file(missing).map(drop),
        storage.stat(missing).map(drop),
        storage.remove(missing),
        storage.rename(missing, Path::new("other.go")),
        storage.open(missing).map(drop),
        storage.read_dir(Path::new("nowhere")).map(drop),
    ];
    for result in kinds {
        let err = result.expect_err("absent");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
    assert!(!storage.exists(missing).expect("exists"));
}

#[rstest]
#[case::local(Backend::local())]
#[case::memory(Backend::memory())]
fn files_and_directories(#[case] backend: Backend) {
    let storage = backend.storage();
    storage.mkdir_all(Path::new("pkg/models"), DIR_MODE).expect("mkdir");
    storage
        .write_file(Path::new("pkg/models/user.go"), b"package models\n", FILE_MODE)
        .expect("write");
    storage
        .write_file(Path::new("pkg/models/a.go"), b"package models\n", FILE_MODE)
        .expect("write");

    assert!(storage.stat(Path::new("pkg/models")).expect("dir").is_dir);
    let info = storage.stat(Path::new("pkg/models/user.go")).expect("file");
    assert!(!info.is_dir);
    assert_eq!(info.len, 15);
    assert_eq!(
        storage.read_dir(Path::new("pkg/models")).expect("list"),
        [PathBuf::from("pkg/models/a.go"), PathBuf::from("pkg/models/user.go")]
    );

    storage
        .rename(Path::new("pkg/models/a.go"), Path::new("pkg/models/b.go"))
        .expect("rename");
    assert!(!storage.exists(Path::new("pkg/models/a.go")).expect("exists"));
    storage.remove(Path::new("pkg/models/b.go")).expect("remove");
    assert_eq!(
        storage.read_dir(Path::new("pkg/models")).expect("list"),
        [PathBuf::from("pkg/models/user.go")]
    );
}

#[rstest]
#[case::local(Backend::local())]
#[case::memory(Backend::memory())]
fn handles_and_temp_files(#[case] backend: Backend) {
    let storage = backend.storage();
    storage.mkdir_all(Path::new("out"), DIR_MODE).expect("mkdir");

    let (staged, mut handle) = storage
        .temp_file(Path::new("out"), ".treadle-*.go")
        .expect("temp");
    handle.write_all(b"package out\n").expect("write");
    handle.flush().expect("flush");
    drop(handle);

    let name = staged.file_name().and_then(|n| n.to_str()).expect("name");
    assert!(name.starts_with(".treadle-") && name.ends_with(".go"), "{name}");
    assert_eq!(staged.parent(), Some(Path::new("out")));

    storage.rename(&staged, Path::new("out/main.go")).expect("rename");
    let mut text = String::new();
    storage
        .open(Path::new("out/main.go"))
        .expect("open")
        .read_to_string(&mut text)
        .expect("read");
    assert_eq!(text, "package out\n");

    let mut created = storage.create(Path::new("out/new.go")).expect("create");
    created.write_all(b"package out\n").expect("write");
    created.flush().expect("flush");
    drop(created);
    assert_eq!(
        storage.read_file(Path::new("out/new.go")).expect("read"),
        b"package out\n"
    );
}

#[cfg(unix)]
#[test]
fn replaced_files_keep_the_regular_mode() {
    use std::os::unix::fs::PermissionsExt;

    use treadle::{AcceptAll, ApplyOutcome, SafeApply};

    let dir = TempDir::new().expect("temp dir");
    let storage = LocalStorage::new(dir.path());
    storage
        .write_file(Path::new("main.go"), b"package main\n", FILE_MODE)
        .expect("write");

    let outcome = SafeApply::new(&storage, &AcceptAll)
        .apply(Path::new("main.go"), Some("package main\n"), "package app\n")
        .expect("apply");

    assert_eq!(outcome, ApplyOutcome::Modified);
    let mode = std::fs::metadata(dir.path().join("main.go"))
        .expect("metadata")
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, FILE_MODE);
}
