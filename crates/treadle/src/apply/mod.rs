//! Persists new file content without ever leaving a partial write behind.
//!
//! Content is staged in a temporary file beside the target, offered to a
//! [`ConflictResolver`], and only then moved into place. An existing target
//! is moved aside to a backup first so a failed replacement can be undone.

mod conflict;

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use treadle_config::{DEFAULT_BACKUP_SUFFIX, DEFAULT_TEMP_PATTERN};

pub use conflict::{
    AcceptAll, ChangeAction, ChangeRecord, ConflictResolver, PREVIEW_BYTES, Prompt, RejectAll,
    resolver_for,
};

use crate::diff;
use crate::error::{Error, Result};
use crate::storage::{DIR_MODE, Storage};

const APPLY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::apply");

/// How an apply ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyOutcome {
    /// A new file was written.
    Created,
    /// An existing file was replaced.
    Modified,
    /// The content was already in place; nothing was touched.
    NoChanges,
    /// The resolver declined; the target is untouched.
    Rejected,
}

impl ApplyOutcome {
    /// Returns whether the target now holds new content.
    #[must_use]
    pub const fn is_written(self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

/// The temp-file, backup and rename sequence behind every write.
pub struct SafeApply<'a> {
    storage: &'a dyn Storage,
    resolver: &'a dyn ConflictResolver,
    backup_suffix: String,
    temp_pattern: String,
}

impl std::fmt::Debug for SafeApply<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafeApply")
            .field("backup_suffix", &self.backup_suffix)
            .field("temp_pattern", &self.temp_pattern)
            .finish_non_exhaustive()
    }
}

impl<'a> SafeApply<'a> {
    /// Creates the protocol over `storage`, gated by `resolver`.
    #[must_use]
    pub fn new(storage: &'a dyn Storage, resolver: &'a dyn ConflictResolver) -> Self {
        Self {
            storage,
            resolver,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_owned(),
            temp_pattern: DEFAULT_TEMP_PATTERN.to_owned(),
        }
    }

    /// Overrides the suffix appended to a target while it is replaced.
    #[must_use]
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// Overrides the temp file name pattern; `*` marks the random part.
    #[must_use]
    pub fn with_temp_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.temp_pattern = pattern.into();
        self
    }

    /// Writes `new` to `path`, where `old` is its current content or `None`
    /// when the file does not exist.
    ///
    /// Identical content returns [`ApplyOutcome::NoChanges`] without touching
    /// storage. A rejected change returns [`ApplyOutcome::Rejected`] and is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when staging, backing up or renaming fails.
    /// The target keeps its original content in every error case the
    /// storage allows to be rolled back.
    pub fn apply(&self, path: &Path, old: Option<&str>, new: &str) -> Result<ApplyOutcome> {
        if old == Some(new) {
            debug!(target: APPLY_TARGET, file = %path.display(), "content unchanged");
            return Ok(ApplyOutcome::NoChanges);
        }

        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        if !dir.as_os_str().is_empty() && dir != Path::new(".") {
            self.storage
                .mkdir_all(dir, DIR_MODE)
                .map_err(|err| Error::storage("create directory", dir, err))?;
        }

        let staged = self.stage(dir, new)?;
        let change = ChangeRecord {
            action: if old.is_some() {
                ChangeAction::Modify
            } else {
                ChangeAction::Create
            },
            file_name: path.to_path_buf(),
            old_content: old.unwrap_or_default().to_owned(),
            new_content: new.to_owned(),
            diff: diff::unified(old.unwrap_or_default(), new, &path.display().to_string()),
        };

        if !self.resolver.resolve(self.storage, path, &staged, &change) {
            self.discard(&staged);
            info!(
                target: APPLY_TARGET,
                file = %path.display(),
                action = %change.action,
                "change rejected"
            );
            return Ok(ApplyOutcome::Rejected);
        }

        let outcome = match change.action {
            ChangeAction::Modify => {
                self.replace(path, &staged)?;
                ApplyOutcome::Modified
            }
            ChangeAction::Create => {
                if let Err(err) = self.storage.rename(&staged, path) {
                    self.discard(&staged);
                    return Err(Error::storage("create", path, err));
                }
                ApplyOutcome::Created
            }
        };
        info!(
            target: APPLY_TARGET,
            file = %path.display(),
            action = %change.action,
            "change applied"
        );
        Ok(outcome)
    }

    /// Writes `content` to a fresh temp file in `dir`.
    fn stage(&self, dir: &Path, content: &str) -> Result<PathBuf> {
        let (staged, mut handle) = self
            .storage
            .temp_file(dir, &self.temp_pattern)
            .map_err(|err| Error::storage("create temp file", dir, err))?;
        let written = handle
            .write_all(content.as_bytes())
            .and_then(|()| handle.flush());
        drop(handle);
        if let Err(err) = written {
            self.discard(&staged);
            return Err(Error::storage("write temp file", &staged, err));
        }
        Ok(staged)
    }

    /// Swaps `staged` into `path`, restoring the original on failure.
    fn replace(&self, path: &Path, staged: &Path) -> Result<()> {
        let backup = self.backup_path(path);
        if let Err(err) = self.storage.rename(path, &backup) {
            self.discard(staged);
            return Err(Error::storage("back up", path, err));
        }
        if let Err(err) = self.storage.rename(staged, path) {
            if let Err(restore) = self.storage.rename(&backup, path) {
                warn!(
                    target: APPLY_TARGET,
                    file = %path.display(),
                    backup = %backup.display(),
                    error = %restore,
                    "could not restore backup"
                );
            }
            self.discard(staged);
            return Err(Error::storage("replace", path, err));
        }
        self.discard(&backup);
        Ok(())
    }

    fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(&self.backup_suffix);
        PathBuf::from(name)
    }

    /// Best-effort removal of a temp or backup file.
    fn discard(&self, path: &Path) {
        if let Err(err) = self.storage.remove(path) {
            warn!(
                target: APPLY_TARGET,
                file = %path.display(),
                error = %err,
                "could not remove leftover file"
            );
        }
    }
}
