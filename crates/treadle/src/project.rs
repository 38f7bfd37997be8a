//! The project facade: reconcile option records against files in storage.
//!
//! [`Project`] ties the pieces together. Each `apply_*` call validates its
//! options, reads the target file, reconciles the requested declaration
//! with what is already there and, when the content changes, persists the
//! result through [`SafeApply`].

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use treadle_config::{Config, DEFAULT_BACKUP_SUFFIX, DEFAULT_PACKAGE_NAME, DEFAULT_TEMP_PATTERN};

use crate::apply::{AcceptAll, ApplyOutcome, ConflictResolver, SafeApply, resolver_for};
use crate::error::Result;
use crate::merge;
use crate::source_set::SourceSet;
use crate::spec::{
    ConstantOptions, DeclarationOptions, FunctionOptions, MethodOptions, StructOptions,
    TypeOptions, VariableOptions,
};
use crate::storage::{Storage, read_optional};

const PROJECT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::project");

/// Settings for a [`Project`].
pub struct ProjectOptions {
    /// Package clause for files created from scratch.
    pub package_name: String,
    /// Gate consulted before any change is written.
    pub resolver: Box<dyn ConflictResolver>,
    /// Suffix of the backup taken while a file is replaced.
    pub backup_suffix: String,
    /// Name pattern for staged files.
    pub temp_pattern: String,
}

impl ProjectOptions {
    /// Derives options from configuration, mapping the conflict policy to
    /// its resolver.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            package_name: config.package_name.clone(),
            resolver: resolver_for(config.conflict_policy),
            backup_suffix: config.backup_suffix.clone(),
            temp_pattern: config.temp_pattern.clone(),
        }
    }

    /// Replaces the resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replaces the package name used for new files.
    #[must_use]
    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }
}

impl Default for ProjectOptions {
    /// Accepts every change and creates `package main` files.
    fn default() -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_owned(),
            resolver: Box::new(AcceptAll),
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_owned(),
            temp_pattern: DEFAULT_TEMP_PATTERN.to_owned(),
        }
    }
}

impl std::fmt::Debug for ProjectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectOptions")
            .field("package_name", &self.package_name)
            .field("backup_suffix", &self.backup_suffix)
            .field("temp_pattern", &self.temp_pattern)
            .finish_non_exhaustive()
    }
}

/// Declarations reconciled against files held by a [`Storage`].
#[derive(Debug)]
pub struct Project<S> {
    storage: S,
    options: ProjectOptions,
}

impl<S: Storage> Project<S> {
    /// Creates a project over `storage`.
    #[must_use]
    pub const fn new(storage: S, options: ProjectOptions) -> Self {
        Self { storage, options }
    }

    /// Returns the underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the project settings.
    #[must_use]
    pub const fn options(&self) -> &ProjectOptions {
        &self.options
    }

    /// Consumes the project, returning its storage.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    fn safe_apply(&self) -> SafeApply<'_> {
        SafeApply::new(&self.storage, self.options.resolver.as_ref())
            .with_backup_suffix(self.options.backup_suffix.clone())
            .with_temp_pattern(self.options.temp_pattern.clone())
    }

    /// Reconciles `options` with its target file and persists the result.
    ///
    /// Options are validated before storage is touched. Content that is
    /// already up to date returns [`ApplyOutcome::NoChanges`] without
    /// consulting the resolver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) for invalid
    /// options, [`Error::Syntax`](crate::Error::Syntax) for malformed files
    /// or raw content and [`Error::Storage`](crate::Error::Storage) when
    /// reading or writing fails.
    pub fn apply(&self, options: &impl DeclarationOptions) -> Result<ApplyOutcome> {
        let spec = options.validate()?;
        let path = options.file_name();
        let existing = read_optional(&self.storage, path)?;
        let merged = merge::reconcile(existing.as_deref(), path, &spec, &self.options.package_name)?;
        if !merged.changed {
            debug!(target: PROJECT_TARGET, file = %path.display(), "nothing to apply");
            return Ok(ApplyOutcome::NoChanges);
        }
        self.safe_apply()
            .apply(path, existing.as_deref(), &merged.content)
    }

    /// Creates or updates a struct.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_struct(&self, options: &StructOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Creates or replaces a function.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_function(&self, options: &FunctionOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Creates or replaces a method.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_method(&self, options: &MethodOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Creates, updates or deletes variables.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_variables(&self, options: &VariableOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Creates, updates or deletes constants.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_constants(&self, options: &ConstantOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Creates, updates or deletes type declarations.
    ///
    /// # Errors
    ///
    /// See [`Project::apply`].
    pub fn apply_types(&self, options: &TypeOptions) -> Result<ApplyOutcome> {
        self.apply(options)
    }

    /// Loads the Go files in `dir` for live editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) when the directory
    /// cannot be read and [`Error::Syntax`](crate::Error::Syntax) for
    /// malformed files.
    pub fn open(&self, dir: &Path) -> Result<SourceSet> {
        SourceSet::load(&self.storage, dir)
    }

    /// Persists every file of `sources` whose content differs from storage.
    ///
    /// Files are written one at a time through [`SafeApply`]; a failure
    /// stops the run and leaves earlier files written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`](crate::Error::Storage) when reading or
    /// writing fails.
    pub fn save(&self, sources: &SourceSet) -> Result<Vec<(PathBuf, ApplyOutcome)>> {
        let apply = self.safe_apply();
        let mut outcomes = Vec::with_capacity(sources.len());
        for doc in sources.files() {
            let existing = read_optional(&self.storage, doc.path())?;
            let outcome = apply.apply(doc.path(), existing.as_deref(), &doc.render())?;
            outcomes.push((doc.path().to_path_buf(), outcome));
        }
        let written = outcomes.iter().filter(|(_, outcome)| outcome.is_written()).count();
        info!(
            target: PROJECT_TARGET,
            files = outcomes.len(),
            written,
            "saved sources"
        );
        Ok(outcomes)
    }
}
