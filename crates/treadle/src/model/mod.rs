//! Declaration model.
//!
//! The model is a read-only snapshot of the top-level declarations in a
//! [`Document`](treadle_syntax::Document). Snapshots carry the byte spans of
//! the nodes they were read from so the rename and merge engines can turn
//! them into text edits; a snapshot is stale once its document changes.

mod scan;
mod tag;

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeclKind;

pub(crate) use scan::{declarations, package_clause};
pub use tag::{StructTag, normalise_annotation};

/// A named, typed parameter of a function or method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name; empty for unnamed parameters.
    #[serde(default)]
    pub name: String,
    /// Parameter type expression, e.g. `*User` or `...string`.
    #[serde(rename = "type")]
    pub type_expr: String,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
        }
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    /// `type Name struct { ... }`.
    Struct(StructDecl),
    /// `func Name(...)`.
    Function(FunctionDecl),
    /// `func (r T) Name(...)`.
    Method(FunctionDecl),
    /// One name of a `var` specification.
    Variable(ValueDecl),
    /// One name of a `const` specification.
    Constant(ValueDecl),
    /// Any `type` specification that is not a struct.
    TypeAlias(TypeDecl),
}

impl Declaration {
    /// Returns the kind of this declaration.
    #[must_use]
    pub const fn kind(&self) -> DeclKind {
        match self {
            Self::Struct(_) => DeclKind::Struct,
            Self::Function(_) => DeclKind::Function,
            Self::Method(_) => DeclKind::Method,
            Self::Variable(_) => DeclKind::Variable,
            Self::Constant(_) => DeclKind::Constant,
            Self::TypeAlias(_) => DeclKind::Type,
        }
    }

    /// Returns the declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(decl) => &decl.name,
            Self::Function(decl) | Self::Method(decl) => &decl.name,
            Self::Variable(decl) | Self::Constant(decl) => &decl.name,
            Self::TypeAlias(decl) => &decl.name,
        }
    }

    /// Returns the file the declaration was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Struct(decl) => &decl.path,
            Self::Function(decl) | Self::Method(decl) => &decl.path,
            Self::Variable(decl) | Self::Constant(decl) => &decl.path,
            Self::TypeAlias(decl) => &decl.path,
        }
    }
}

/// A struct type declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    /// File containing the struct.
    pub path: PathBuf,
    /// Struct name.
    pub name: String,
    /// Type parameters including brackets, e.g. `[T any]`.
    pub type_parameters: Option<String>,
    /// Fields in declaration order, one entry per name.
    pub fields: Vec<FieldDecl>,
    pub(crate) spec_span: Range<usize>,
    pub(crate) type_span: Range<usize>,
    pub(crate) body_span: Range<usize>,
}

impl StructDecl {
    /// Returns the field named `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns the field names in order.
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field name; for embedded fields this is the embedded type's name.
    pub name: String,
    /// Type expression as written.
    pub type_expr: String,
    /// Tag literal as written, including its quotes.
    pub tag: Option<String>,
    /// Whether the field is embedded.
    pub embedded: bool,
    pub(crate) name_span: Option<Range<usize>>,
}

impl FieldDecl {
    /// Parses the tag literal into key/value entries.
    #[must_use]
    pub fn parsed_tag(&self) -> StructTag {
        self.tag.as_deref().map(StructTag::parse).unwrap_or_default()
    }
}

/// A method receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    /// Receiver variable name, if any.
    pub name: Option<String>,
    /// Receiver type as written, e.g. `*User`.
    pub type_expr: String,
}

impl Receiver {
    /// Returns the receiver type without pointer indirection or type
    /// arguments.
    #[must_use]
    pub fn base_type(&self) -> &str {
        base_type_name(&self.type_expr)
    }
}

/// Strips pointer indirection and type arguments from a receiver type.
#[must_use]
pub fn base_type_name(type_expr: &str) -> &str {
    let stripped = type_expr.trim().trim_start_matches('*').trim_start();
    stripped.split('[').next().unwrap_or(stripped).trim()
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    /// File containing the declaration.
    pub path: PathBuf,
    /// Function or method name.
    pub name: String,
    /// Receiver, for methods.
    pub receiver: Option<Receiver>,
    /// Type parameters including brackets.
    pub type_parameters: Option<String>,
    /// Parameters in order, one entry per name.
    pub parameters: Vec<Parameter>,
    /// Result list as written, e.g. `error` or `(int, error)`.
    pub result: Option<String>,
    /// Body statements with the outer indentation removed.
    pub body: Option<String>,
    pub(crate) span: Range<usize>,
    pub(crate) body_span: Option<Range<usize>>,
}

/// Whether a value declaration is a `var` or a `const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `var`.
    Var,
    /// `const`.
    Const,
}

impl ValueKind {
    /// Returns the Go keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Const => "const",
        }
    }

    /// Returns the matching declaration kind.
    #[must_use]
    pub const fn decl_kind(self) -> DeclKind {
        match self {
            Self::Var => DeclKind::Variable,
            Self::Const => DeclKind::Constant,
        }
    }
}

/// One name of a `var` or `const` specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecl {
    /// File containing the declaration.
    pub path: PathBuf,
    /// Declared name.
    pub name: String,
    /// `var` or `const`.
    pub kind: ValueKind,
    /// Declared type, if written.
    pub type_expr: Option<String>,
    /// Value expression paired with this name, if any.
    pub value: Option<String>,
    pub(crate) spec: SpecSite,
}

/// A `type` specification that is not a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    /// File containing the declaration.
    pub path: PathBuf,
    /// Declared name.
    pub name: String,
    /// Type parameters including brackets.
    pub type_parameters: Option<String>,
    /// Underlying type expression.
    pub definition: String,
    /// Whether this is an alias (`type A = B`).
    pub alias: bool,
    pub(crate) spec: SpecSite,
}

/// Where a specification sits inside its declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpecSite {
    /// Span of the whole specification.
    pub(crate) span: Range<usize>,
    /// Span of the enclosing `var`/`const`/`type` declaration.
    pub(crate) decl_span: Range<usize>,
    /// Whether the declaration uses a parenthesised group.
    pub(crate) grouped: bool,
    /// Number of specifications in the enclosing declaration.
    pub(crate) siblings: usize,
    /// Every name declared by the specification.
    pub(crate) names: Vec<String>,
    /// Every value expression of the specification.
    pub(crate) values: Vec<String>,
}

impl SpecSite {
    /// Span to delete when removing this specification entirely.
    pub(crate) fn removal_span(&self) -> Range<usize> {
        if self.grouped && self.siblings > 1 {
            self.span.clone()
        } else {
            self.decl_span.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::base_type_name;

    #[rstest]
    #[case("User", "User")]
    #[case("*User", "User")]
    #[case(" * User ", "User")]
    #[case("*List[T]", "List")]
    fn receiver_types_normalise(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(base_type_name(input), expected);
    }
}
