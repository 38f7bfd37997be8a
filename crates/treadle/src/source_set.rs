//! A set of parsed files searched and edited as one package.
//!
//! [`SourceSet`] is the live model: lookups scan files in insertion order
//! and return the first match, and edits mutate the owning [`Document`] in
//! place. Both [`Project`](crate::Project) and
//! [`Template`](crate::Template) are built on it.

use std::path::{Path, PathBuf};

use tracing::debug;
use treadle_syntax::Document;

use crate::codegen::BodyItem;
use crate::error::{DeclKind, Error, Result};
use crate::model::{
    Declaration, FieldDecl, FunctionDecl, StructDecl, StructTag, TypeDecl, ValueDecl,
    declarations, package_clause,
};
use crate::storage::{Storage, read_optional};
use crate::structs;

const SOURCES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::sources");

/// Parsed Go files of one package.
#[derive(Debug, Default)]
pub struct SourceSet {
    files: Vec<Document>,
}

impl SourceSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Parses `(path, text)` pairs in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] for a file that does not parse and
    /// [`Error::Duplicate`] when a path repeats.
    pub fn from_sources<P, S>(sources: impl IntoIterator<Item = (P, S)>) -> Result<Self>
    where
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for (path, text) in sources {
            set.insert(Document::parse(path, text)?)?;
        }
        Ok(set)
    }

    /// Loads every `.go` file directly inside `dir`, sorted by name.
    ///
    /// Documents keep the paths storage reports, i.e. `dir` joined with the
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the directory cannot be listed or a
    /// file cannot be read, and [`Error::Syntax`] for malformed files.
    pub fn load(storage: &dyn Storage, dir: &Path) -> Result<Self> {
        let mut paths = storage
            .read_dir(dir)
            .map_err(|err| Error::storage("list", dir, err))?;
        paths.retain(|path| path.extension().is_some_and(|ext| ext == "go"));
        let mut set = Self::new();
        for path in paths {
            let Some(text) = read_optional(storage, &path)? else {
                continue;
            };
            set.insert(Document::parse(path, text)?)?;
        }
        debug!(
            target: SOURCES_TARGET,
            dir = %dir.display(),
            files = set.len(),
            "loaded sources"
        );
        Ok(set)
    }

    /// Adds a parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] when a document with the same path is
    /// already present.
    pub fn insert(&mut self, doc: Document) -> Result<()> {
        if self.file(doc.path()).is_some() {
            return Err(Error::duplicate(DeclKind::File, doc.path().display().to_string()));
        }
        self.files.push(doc);
        Ok(())
    }

    /// Removes and returns the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no document has that path.
    pub fn remove_file(&mut self, path: &Path) -> Result<Document> {
        let index = self
            .files
            .iter()
            .position(|doc| doc.path() == path)
            .ok_or_else(|| Error::not_found(DeclKind::File, path.display().to_string()))?;
        Ok(self.files.remove(index))
    }

    /// Moves the document at `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `from` is absent and
    /// [`Error::Duplicate`] when `to` is taken.
    pub fn rename_file(&mut self, from: &Path, to: &Path) -> Result<()> {
        if from == to {
            return self.require_file(from).map(|_| ());
        }
        if self.file(to).is_some() {
            return Err(Error::duplicate(DeclKind::File, to.display().to_string()));
        }
        let doc = self
            .files
            .iter_mut()
            .find(|doc| doc.path() == from)
            .ok_or_else(|| Error::not_found(DeclKind::File, from.display().to_string()))?;
        doc.set_path(to);
        Ok(())
    }

    /// Returns the documents in order.
    #[must_use]
    pub fn files(&self) -> &[Document] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [Document] {
        &mut self.files
    }

    /// Returns the document at `path`.
    #[must_use]
    pub fn file(&self, path: &Path) -> Option<&Document> {
        self.files.iter().find(|doc| doc.path() == path)
    }

    /// Returns the document at `path` or [`Error::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no document has that path.
    pub fn require_file(&self, path: &Path) -> Result<&Document> {
        self.file(path)
            .ok_or_else(|| Error::not_found(DeclKind::File, path.display().to_string()))
    }

    pub(crate) fn file_mut(&mut self, path: &Path) -> Result<&mut Document> {
        self.files
            .iter_mut()
            .find(|doc| doc.path() == path)
            .ok_or_else(|| Error::not_found(DeclKind::File, path.display().to_string()))
    }

    /// Returns the number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns whether the set holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns the package name of the first file.
    #[must_use]
    pub fn package_name(&self) -> Option<String> {
        self.files
            .iter()
            .find_map(package_clause)
            .map(|(name, _)| name)
    }

    /// Returns every top-level declaration, file by file.
    #[must_use]
    pub fn declarations(&self) -> Vec<Declaration> {
        self.files.iter().flat_map(declarations).collect()
    }

    fn find<T>(
        &self,
        kind: DeclKind,
        name: &str,
        pick: impl Fn(Declaration) -> Option<T>,
    ) -> Option<T> {
        let found = self
            .files
            .iter()
            .flat_map(declarations)
            .find_map(pick);
        debug!(
            target: SOURCES_TARGET,
            kind = %kind,
            name,
            found = found.is_some(),
            "lookup"
        );
        found
    }

    /// Finds the struct named `name`.
    #[must_use]
    pub fn find_struct(&self, name: &str) -> Option<StructDecl> {
        self.find(DeclKind::Struct, name, |decl| match decl {
            Declaration::Struct(found) if found.name == name => Some(found),
            _ => None,
        })
    }

    /// Finds the package-level function named `name`.
    #[must_use]
    pub fn find_function(&self, name: &str) -> Option<FunctionDecl> {
        self.find(DeclKind::Function, name, |decl| match decl {
            Declaration::Function(found) if found.name == name => Some(found),
            _ => None,
        })
    }

    /// Finds method `name` on `receiver`; `*T` and `T` are equivalent.
    #[must_use]
    pub fn find_method(&self, receiver: &str, name: &str) -> Option<FunctionDecl> {
        let wanted = crate::model::base_type_name(receiver);
        self.find(DeclKind::Method, name, |decl| match decl {
            Declaration::Method(found)
                if found.name == name
                    && found
                        .receiver
                        .as_ref()
                        .is_some_and(|recv| recv.base_type() == wanted) =>
            {
                Some(found)
            }
            _ => None,
        })
    }

    /// Finds the variable named `name`.
    #[must_use]
    pub fn find_variable(&self, name: &str) -> Option<ValueDecl> {
        self.find(DeclKind::Variable, name, |decl| match decl {
            Declaration::Variable(found) if found.name == name => Some(found),
            _ => None,
        })
    }

    /// Finds the constant named `name`.
    #[must_use]
    pub fn find_constant(&self, name: &str) -> Option<ValueDecl> {
        self.find(DeclKind::Constant, name, |decl| match decl {
            Declaration::Constant(found) if found.name == name => Some(found),
            _ => None,
        })
    }

    /// Finds the non-struct type named `name`.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<TypeDecl> {
        self.find(DeclKind::Type, name, |decl| match decl {
            Declaration::TypeAlias(found) if found.name == name => Some(found),
            _ => None,
        })
    }

    /// Like [`find_struct`](Self::find_struct) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct does not exist.
    pub fn require_struct(&self, name: &str) -> Result<StructDecl> {
        self.find_struct(name)
            .ok_or_else(|| Error::not_found(DeclKind::Struct, name))
    }

    /// Like [`find_function`](Self::find_function) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist.
    pub fn require_function(&self, name: &str) -> Result<FunctionDecl> {
        self.find_function(name)
            .ok_or_else(|| Error::not_found(DeclKind::Function, name))
    }

    /// Like [`find_method`](Self::find_method) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] naming `Receiver.name`.
    pub fn require_method(&self, receiver: &str, name: &str) -> Result<FunctionDecl> {
        self.find_method(receiver, name).ok_or_else(|| {
            Error::not_found(
                DeclKind::Method,
                format!("{}.{name}", crate::model::base_type_name(receiver)),
            )
        })
    }

    /// Like [`find_variable`](Self::find_variable) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the variable does not exist.
    pub fn require_variable(&self, name: &str) -> Result<ValueDecl> {
        self.find_variable(name)
            .ok_or_else(|| Error::not_found(DeclKind::Variable, name))
    }

    /// Like [`find_constant`](Self::find_constant) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the constant does not exist.
    pub fn require_constant(&self, name: &str) -> Result<ValueDecl> {
        self.find_constant(name)
            .ok_or_else(|| Error::not_found(DeclKind::Constant, name))
    }

    /// Like [`find_type`](Self::find_type) but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the type does not exist.
    pub fn require_type(&self, name: &str) -> Result<TypeDecl> {
        self.find_type(name)
            .ok_or_else(|| Error::not_found(DeclKind::Type, name))
    }

    /// Opens the struct named `name` for editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct does not exist.
    pub fn edit_struct(&mut self, name: &str) -> Result<StructEditor<'_>> {
        self.require_struct(name)?;
        Ok(StructEditor {
            set: self,
            name: name.to_owned(),
        })
    }

    /// Produces an independent copy by rendering and reparsing every file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] if a rendered file fails to reparse.
    pub fn reparsed(&self) -> Result<Self> {
        let files = self
            .files
            .iter()
            .map(Document::reparsed)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { files })
    }

    /// Runs `edit` against a copy and keeps the copy only when it succeeds.
    pub(crate) fn transact<T>(&mut self, edit: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut staged = self.reparsed()?;
        let value = edit(&mut staged)?;
        *self = staged;
        Ok(value)
    }

    /// Reads, edits and rewrites the body of struct `name`.
    pub(crate) fn edit_struct_items<T>(
        &mut self,
        name: &str,
        edit: impl FnOnce(&mut Vec<BodyItem>) -> Result<T>,
    ) -> Result<T> {
        let decl = self.require_struct(name)?;
        let doc = self.file_mut(&decl.path)?;
        let mut items = structs::current_items(doc, &decl)?;
        let value = edit(&mut items)?;
        structs::rewrite(doc, &decl, &items)?;
        Ok(value)
    }
}

/// Live editor for one struct.
///
/// Every call re-reads the struct, so edits always apply to the current
/// text.
#[derive(Debug)]
pub struct StructEditor<'set> {
    set: &'set mut SourceSet,
    name: String,
}

impl StructEditor<'_> {
    /// Returns the struct name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a fresh snapshot of the struct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the struct disappeared.
    pub fn snapshot(&self) -> Result<StructDecl> {
        self.set.require_struct(&self.name)
    }

    /// Appends field `name` of type `type_expr` with `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Duplicate`] when the field exists and
    /// [`Error::Syntax`] when `type_expr` does not parse.
    pub fn add(&mut self, name: &str, type_expr: &str, tag: &StructTag) -> Result<()> {
        self.set.edit_struct_items(&self.name, |items| {
            if structs::has_field(items, name) {
                return Err(Error::duplicate(DeclKind::Field, name));
            }
            structs::upsert_field(items, name, type_expr, tag.to_literal());
            Ok(())
        })
    }

    /// Removes field `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the field does not exist.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.set.edit_struct_items(&self.name, |items| {
            if structs::remove_field(items, name) {
                Ok(())
            } else {
                Err(Error::not_found(DeclKind::Field, name))
            }
        })
    }

    /// Opens field `name` for editing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the field does not exist.
    pub fn field(&mut self, name: &str) -> Result<FieldEditor<'_>> {
        let decl = self.snapshot()?;
        if decl.field(name).is_none() {
            return Err(Error::not_found(DeclKind::Field, name));
        }
        Ok(FieldEditor {
            set: &mut *self.set,
            struct_name: self.name.clone(),
            name: name.to_owned(),
        })
    }
}

/// Live editor for one struct field.
#[derive(Debug)]
pub struct FieldEditor<'set> {
    set: &'set mut SourceSet,
    struct_name: String,
    name: String,
}

impl FieldEditor<'_> {
    /// Returns a fresh snapshot of the field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the struct or field disappeared.
    pub fn snapshot(&self) -> Result<FieldDecl> {
        self.set
            .require_struct(&self.struct_name)?
            .field(&self.name)
            .cloned()
            .ok_or_else(|| Error::not_found(DeclKind::Field, self.name.clone()))
    }

    /// Replaces the field's type, keeping its tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] when `type_expr` does not parse.
    pub fn set_type(&mut self, type_expr: &str) -> Result<()> {
        let name = self.name.clone();
        self.set.edit_struct_items(&self.struct_name, |items| {
            structs::upsert_field(items, &name, type_expr, None);
            Ok(())
        })
    }

    /// Replaces the whole tag; an empty tag removes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the field disappeared.
    pub fn set_tags(&mut self, tag: &StructTag) -> Result<()> {
        let literal = tag.to_literal();
        self.update_tag(|_| literal)
    }

    /// Sets one tag key, replacing its value or appending it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the field disappeared.
    pub fn add_tag(&mut self, key: &str, value: &str) -> Result<()> {
        self.update_tag(|current| {
            let mut tag = current.map(StructTag::parse).unwrap_or_default();
            tag.set(key, value);
            tag.to_literal()
        })
    }

    fn update_tag(&mut self, update: impl FnOnce(Option<&str>) -> Option<String>) -> Result<()> {
        let name = self.name.clone();
        self.set.edit_struct_items(&self.struct_name, |items| {
            if structs::update_tag(items, &name, update) {
                Ok(())
            } else {
                Err(Error::not_found(DeclKind::Field, name.clone()))
            }
        })
    }
}
