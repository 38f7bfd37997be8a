//! Immutable views over a reference package.
//!
//! A [`Template`] is loaded once and never changes. Every transform renders
//! and reparses the whole source set into a fresh copy, applies a single
//! edit to the copy and returns it, so one template can seed any number of
//! independent transformation chains. The `extract_*` methods turn what a
//! template declares into option records that a
//! [`Project`](crate::Project) can apply elsewhere.

mod extract;

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use treadle_syntax::Document;

use crate::error::{DeclKind, Error, Result};
use crate::model::StructTag;
use crate::source_set::SourceSet;
use crate::spec::Field;
use crate::storage::{DIR_MODE, FILE_MODE, Storage};

const TEMPLATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::template");

/// A parsed package that transforms into new, independent templates.
#[derive(Debug)]
pub struct Template {
    sources: SourceSet,
    package: String,
}

impl Template {
    /// Loads every `.go` file directly inside `dir`.
    ///
    /// File paths are kept relative to `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `dir` holds no Go files,
    /// [`Error::Storage`] when it cannot be read and [`Error::Syntax`] for
    /// malformed sources.
    pub fn load(storage: &dyn Storage, dir: &Path) -> Result<Self> {
        let mut sources = SourceSet::load(storage, dir)?;
        for doc in sources.files_mut() {
            let relative = doc
                .path()
                .strip_prefix(dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| doc.path().to_path_buf());
            doc.set_path(relative);
        }
        let template = Self::from_set(sources, dir)?;
        info!(
            target: TEMPLATE_TARGET,
            dir = %dir.display(),
            files = template.sources.len(),
            package = %template.package,
            "loaded template"
        );
        Ok(template)
    }

    /// Builds a template from in-memory `(path, text)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `sources` is empty and
    /// [`Error::Syntax`] for malformed sources.
    pub fn from_sources<P, S>(sources: impl IntoIterator<Item = (P, S)>) -> Result<Self>
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        Self::from_set(SourceSet::from_sources(sources)?, Path::new("."))
    }

    fn from_set(sources: SourceSet, origin: &Path) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::not_found(
                DeclKind::File,
                origin.join("*.go").display().to_string(),
            ));
        }
        let package = sources.package_name().unwrap_or_default();
        Ok(Self { sources, package })
    }

    /// Returns the package name of the first file.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package
    }

    /// Returns the parsed sources.
    #[must_use]
    pub const fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Returns the file paths in order.
    #[must_use]
    pub fn file_names(&self) -> Vec<&Path> {
        self.sources.files().iter().map(Document::path).collect()
    }

    /// Renders the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no such file is part of the
    /// template.
    pub fn render(&self, path: &Path) -> Result<String> {
        self.sources.require_file(path).map(Document::render)
    }

    /// Copies the template and applies `edit` to the copy.
    fn derive<T>(&self, operation: &str, edit: impl FnOnce(&mut SourceSet) -> Result<T>) -> Result<Self> {
        let mut sources = self.sources.reparsed()?;
        edit(&mut sources)?;
        let package = sources.package_name().unwrap_or_else(|| self.package.clone());
        debug!(target: TEMPLATE_TARGET, operation, "derived template");
        Ok(Self { sources, package })
    }

    /// Returns a copy with struct `old` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct does not exist and
    /// [`Error::Duplicate`] when `new` is taken.
    pub fn rename_struct(&self, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_struct", |set| set.rename_struct(old, new))
    }

    /// Returns a copy with field `old` of `struct_name` replaced by `field`.
    ///
    /// The field keeps its type and tag unless `field` sets them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct or field does not exist.
    pub fn rename_struct_field(&self, struct_name: &str, old: &str, field: &Field) -> Result<Self> {
        self.derive("rename_struct_field", |set| {
            set.rename_struct_field(struct_name, old, field)
        })
    }

    /// Returns a copy with function `old` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist.
    pub fn rename_function(&self, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_function", |set| set.rename_function(old, new))
    }

    /// Returns a copy with variable `old` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the variable does not exist.
    pub fn rename_variable(&self, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_variable", |set| set.rename_variable(old, new))
    }

    /// Returns a copy with constant `old` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the constant does not exist.
    pub fn rename_constant(&self, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_constant", |set| set.rename_constant(old, new))
    }

    /// Returns a copy with type `old` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no type or struct is named `old`.
    pub fn rename_type(&self, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_type", |set| set.rename_type(old, new))
    }

    /// Returns a copy with method `old` on `receiver` renamed to `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the method does not exist.
    pub fn rename_method(&self, receiver: &str, old: &str, new: &str) -> Result<Self> {
        self.derive("rename_method", |set| set.rename_method(receiver, old, new))
    }

    /// Returns a copy with `field` appended to `struct_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct does not exist and
    /// [`Error::Duplicate`] when it already has the field.
    pub fn add_struct_field(&self, struct_name: &str, field: &Field) -> Result<Self> {
        let tag = field
            .tag_literal()
            .map(|literal| StructTag::parse(&literal))
            .unwrap_or_default();
        self.derive("add_struct_field", |set| {
            set.edit_struct(struct_name)?
                .add(&field.name, &field.type_expr, &tag)
        })
    }

    /// Returns a copy without field `name` of `struct_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct or field does not exist.
    pub fn remove_struct_field(&self, struct_name: &str, name: &str) -> Result<Self> {
        self.derive("remove_struct_field", |set| {
            set.edit_struct(struct_name)?.remove(name)
        })
    }

    /// Returns a copy without method `name` on `receiver`.
    ///
    /// A method that is still called keeps a stub body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the method does not exist.
    pub fn remove_method(&self, receiver: &str, name: &str) -> Result<Self> {
        self.derive("remove_method", |set| set.remove_method(receiver, name).map(|_| ()))
    }

    /// Returns a copy without function `name`.
    ///
    /// A function that is still called keeps a stub body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist.
    pub fn remove_function(&self, name: &str) -> Result<Self> {
        self.derive("remove_function", |set| set.remove_function(name).map(|_| ()))
    }

    /// Returns a copy with function `name` duplicated as `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist and
    /// [`Error::Duplicate`] when `new` is taken.
    pub fn duplicate_function(&self, name: &str, new: &str) -> Result<Self> {
        self.derive("duplicate_function", |set| set.duplicate_function(name, new))
    }

    /// Returns a copy whose files all declare package `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is not an identifier.
    pub fn with_package_name(&self, name: &str) -> Result<Self> {
        self.derive("with_package_name", |set| set.set_package_name(name))
    }

    /// Returns a copy whose files all carry `//go:build` with the
    /// conjunction of `tags`; an empty `tags` removes the constraint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a tag is not a build tag.
    pub fn with_build_tags<S: AsRef<str>>(&self, tags: &[S]) -> Result<Self> {
        self.derive("with_build_tags", |set| set.set_build_tags(tags))
    }

    /// Returns the build constraint of the first file carrying one.
    #[must_use]
    pub fn build_constraint(&self) -> Option<String> {
        self.sources.build_constraint()
    }

    /// Returns a copy with file `from` moved to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `from` is absent and
    /// [`Error::Duplicate`] when `to` is taken.
    pub fn rename_file(&self, from: &Path, to: &Path) -> Result<Self> {
        self.derive("rename_file", |set| set.rename_file(from, to))
    }

    /// Writes every file under `dir`, returning the written paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when a directory or file cannot be
    /// written.
    pub fn write_to(&self, storage: &dyn Storage, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.sources.len());
        for doc in self.sources.files() {
            let target = dir.join(doc.path());
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                storage
                    .mkdir_all(parent, DIR_MODE)
                    .map_err(|err| Error::storage("create directory", parent, err))?;
            }
            storage
                .write_file(&target, doc.render().as_bytes(), FILE_MODE)
                .map_err(|err| Error::storage("write", &target, err))?;
            written.push(target);
        }
        info!(
            target: TEMPLATE_TARGET,
            dir = %dir.display(),
            files = written.len(),
            "wrote template"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::storage::MemoryStorage;

    const MODELS: &str = "package models

type Customer struct {
\tCustomerID int    `json:\"customer_id\"`
\tName       string
}

func (c *Customer) Label() string {
\treturn c.Name
}

func NewCustomer(id int) *Customer {
\treturn &Customer{CustomerID: id}
}
";

    const HELPERS: &str = "package models

const Limit = 10

var registry = map[int]*Customer{}

func describe(c *Customer) string {
\treturn c.Label()
}
";

    #[fixture]
    fn template() -> Template {
        Template::from_sources([("models.go", MODELS), ("helpers.go", HELPERS)]).expect("template")
    }

    #[rstest]
    fn transforms_leave_the_source_untouched(template: Template) {
        let renamed = template.rename_struct("Customer", "User").expect("rename");
        assert!(renamed.sources().find_struct("User").is_some());
        assert!(renamed.sources().find_struct("Customer").is_none());
        assert_eq!(template.render(Path::new("models.go")).expect("render"), MODELS);
        assert_eq!(template.render(Path::new("helpers.go")).expect("render"), HELPERS);
    }

    #[rstest]
    fn chains_are_independent(template: Template) {
        let first = template.rename_struct("Customer", "User").expect("first");
        let second = template.rename_struct("Customer", "Client").expect("second");
        assert!(first.sources().find_struct("Client").is_none());
        assert!(second.sources().find_struct("User").is_none());
    }

    #[rstest]
    fn failed_transform_reports_not_found(template: Template) {
        let err = template.rename_function("Missing", "Other").expect_err("missing");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn add_field_rejects_duplicates(template: Template) {
        let field = Field::new("Name", "string");
        let err = template.add_struct_field("Customer", &field).expect_err("duplicate");
        assert!(err.is_duplicate());
    }

    #[rstest]
    fn add_and_remove_fields(template: Template) {
        let added = template
            .add_struct_field("Customer", &Field::new("Email", "string").with_annotation("json:\"email\""))
            .expect("add");
        let decl = added.sources().require_struct("Customer").expect("struct");
        assert_eq!(decl.field_names(), ["CustomerID", "Name", "Email"]);
        assert_eq!(
            decl.field("Email").and_then(|f| f.tag.as_deref()),
            Some("`json:\"email\"`")
        );

        let removed = added.remove_struct_field("Customer", "Name").expect("remove");
        let fields = removed.sources().require_struct("Customer").expect("struct");
        assert_eq!(fields.field_names(), ["CustomerID", "Email"]);

        let err = template.remove_struct_field("Customer", "Email").expect_err("absent");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn package_name_follows_transform(template: Template) {
        assert_eq!(template.package_name(), "models");
        let renamed = template.with_package_name("billing").expect("package");
        assert_eq!(renamed.package_name(), "billing");
        assert!(renamed
            .render(Path::new("helpers.go"))
            .expect("render")
            .starts_with("package billing"));
    }

    #[rstest]
    fn build_tags_follow_transform(template: Template) {
        let tagged = template.with_build_tags(&["integration"]).expect("tags");
        assert_eq!(template.build_constraint(), None);
        assert_eq!(tagged.build_constraint().as_deref(), Some("integration"));
        assert!(tagged
            .render(Path::new("helpers.go"))
            .expect("render")
            .starts_with("//go:build integration\n\npackage models"));

        let cleared = tagged.with_build_tags::<&str>(&[]).expect("clear");
        assert_eq!(cleared.build_constraint(), None);
        assert!(template.with_build_tags(&["two words"]).expect_err("invalid").is_validation());
    }

    #[rstest]
    fn called_method_removal_keeps_stub(template: Template) {
        let removed = template.remove_method("*Customer", "Label").expect("remove");
        let method = removed.sources().require_method("Customer", "Label").expect("stub");
        assert_eq!(method.body.as_deref(), Some("return \"not implemented\""));
    }

    #[rstest]
    fn duplicate_and_rename_method(template: Template) {
        let copied = template.duplicate_function("NewCustomer", "MakeCustomer").expect("copy");
        assert!(copied.sources().find_function("NewCustomer").is_some());
        assert!(copied.sources().find_function("MakeCustomer").is_some());

        let renamed = template.rename_method("Customer", "Label", "Title").expect("rename");
        let helpers = renamed.render(Path::new("helpers.go")).expect("render");
        assert!(helpers.contains("c.Title()"));
    }

    #[test]
    fn empty_sources_are_rejected() {
        let err = Template::from_sources(Vec::<(PathBuf, String)>::new()).expect_err("empty");
        assert!(err.is_not_found());
    }

    #[test]
    fn load_keeps_paths_relative() {
        let storage = MemoryStorage::with_files([
            ("tmpl/b.go", "package shapes\n\nvar B = 2\n"),
            ("tmpl/a.go", "package shapes\n\nvar A = 1\n"),
            ("tmpl/notes.txt", "ignored"),
        ]);
        let template = Template::load(&storage, Path::new("tmpl")).expect("load");
        assert_eq!(
            template.file_names(),
            [Path::new("a.go"), Path::new("b.go")]
        );
        assert_eq!(template.package_name(), "shapes");
    }

    #[test]
    fn load_without_go_files_fails() {
        let storage = MemoryStorage::with_files([("tmpl/readme.md", "hi")]);
        let err = Template::load(&storage, Path::new("tmpl")).expect_err("no files");
        assert!(err.is_not_found());
    }

    #[rstest]
    fn write_to_renders_every_file(template: Template) {
        let storage = MemoryStorage::new();
        let renamed = template.rename_file(Path::new("helpers.go"), Path::new("util/helpers.go")).expect("move");
        let written = renamed.write_to(&storage, Path::new("out")).expect("write");
        assert_eq!(
            written,
            [PathBuf::from("out/models.go"), PathBuf::from("out/util/helpers.go")]
        );
        assert_eq!(storage.contents(Path::new("out/util/helpers.go")).as_deref(), Some(HELPERS));
    }
}
