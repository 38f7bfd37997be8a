//! Declarative creation and incremental update of Go declarations.
//!
//! The engine keeps generated Go packages in step with a changing schema
//! while preserving what people added by hand:
//!
//! - [`Project`] reconciles option records such as [`StructOptions`] against
//!   files in a [`Storage`](storage::Storage) and persists the result
//!   through the [`SafeApply`](apply::SafeApply) protocol, which never leaves
//!   a partially written file behind.
//! - [`SourceSet`] is the live model of a package: lookups, struct and field
//!   editors, and syntactic renames that reach every reference.
//! - [`Template`] is an immutable view of a reference package. Transforms
//!   return new templates, and `extract_*` turns declarations back into
//!   option records.
//!
//! # Example
//!
//! ```
//! use treadle::{Field, Project, ProjectOptions, StructOptions};
//! use treadle::storage::MemoryStorage;
//!
//! let project = Project::new(
//!     MemoryStorage::new(),
//!     ProjectOptions::default().with_package_name("models"),
//! );
//! project.apply_struct(&StructOptions {
//!     file_name: "user.go".into(),
//!     name: "User".into(),
//!     fields: vec![Field::new("ID", "string"), Field::new("Name", "string")],
//!     ..StructOptions::default()
//! })?;
//! # Ok::<(), treadle::Error>(())
//! ```

pub mod apply;
mod codegen;
pub mod diff;
mod edits;
mod error;
mod indent;
pub mod merge;
pub mod model;
mod project;
mod rename;
mod source_set;
mod spec;
pub mod storage;
mod structs;
pub mod telemetry;
mod template;

pub use apply::{
    AcceptAll, ApplyOutcome, ChangeAction, ChangeRecord, ConflictResolver, Prompt, RejectAll,
    SafeApply,
};
pub use error::{DeclKind, Error, Result};
pub use model::{
    Declaration, FieldDecl, FunctionDecl, Parameter, Receiver, StructDecl, StructTag, TypeDecl,
    ValueDecl, ValueKind,
};
pub use project::{Project, ProjectOptions};
pub use rename::{Removal, STUB_STRING};
pub use source_set::{FieldEditor, SourceSet, StructEditor};
pub use spec::{
    CallableForm, CallableSpec, ConstantOptions, DeclarationOptions, DeclarationSpec,
    EntriesForm, Field, FunctionOptions, MethodOptions, ReceiverSpec, StructBody, StructOptions,
    StructSpec, TypeDef, TypeOptions, TypesSpec, ValueDef, ValuesSpec, VariableOptions,
};
pub use template::Template;
pub use treadle_config::{Config, ConflictPolicy, LogFormat};
