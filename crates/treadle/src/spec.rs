//! Declaration options and the validated specs derived from them.
//!
//! Each option record accepts either structured fields or one raw-content
//! string. [`DeclarationOptions::validate`] checks the record before any
//! storage access and yields a [`DeclarationSpec`] for the merge engine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{Parameter, ValueKind, normalise_annotation};

/// A struct field to ensure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Type expression.
    #[serde(rename = "type")]
    pub type_expr: String,
    /// Tag, with or without backticks; empty for none.
    pub annotation: String,
}

impl Field {
    /// Creates a field without annotation.
    #[must_use]
    pub fn new(name: impl Into<String>, type_expr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
            annotation: String::new(),
        }
    }

    /// Returns the field with an annotation attached.
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }

    /// Returns the annotation as a tag literal.
    #[must_use]
    pub fn tag_literal(&self) -> Option<String> {
        normalise_annotation(&self.annotation)
    }
}

/// A variable or constant to ensure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueDef {
    /// Declared name.
    pub name: String,
    /// Declared type; empty to omit.
    #[serde(rename = "type")]
    pub type_expr: String,
    /// Value expression; empty to omit.
    pub value: String,
}

impl ValueDef {
    /// Creates a definition.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        type_expr: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_expr: type_expr.into(),
            value: value.into(),
        }
    }
}

/// A named type to ensure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeDef {
    /// Declared name.
    pub name: String,
    /// Underlying type; a leading `=` declares an alias.
    pub definition: String,
}

impl TypeDef {
    /// Creates a type definition.
    #[must_use]
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

/// Options for creating or updating a struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Struct name.
    pub name: String,
    /// Fields to ensure exist.
    pub fields: Vec<Field>,
    /// Raw field list, one field per line.
    pub content: Option<String>,
    /// Field names to remove.
    pub delete_fields: Vec<String>,
    /// Keep existing fields that are not mentioned.
    pub preserve_existing: bool,
}

/// Options for creating or updating a package-level function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Function name.
    pub name: String,
    /// Parameters in order.
    pub parameters: Vec<Parameter>,
    /// Result list; empty for none.
    pub return_type: String,
    /// Body statements without surrounding braces.
    pub body: String,
    /// Raw text following the name: signature and body.
    pub content: Option<String>,
}

/// Options for creating or updating a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Method name.
    pub name: String,
    /// Receiver variable; derived from the type when empty.
    pub receiver_name: String,
    /// Receiver type, e.g. `*User`.
    pub receiver_type: String,
    /// Parameters in order.
    pub parameters: Vec<Parameter>,
    /// Result list; empty for none.
    pub return_type: String,
    /// Body statements without surrounding braces.
    pub body: String,
    /// Raw text following the method name: signature and body.
    pub content: Option<String>,
}

/// Options for creating or updating `var` declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Variables to ensure exist.
    pub variables: Vec<ValueDef>,
    /// Raw `var` declarations.
    pub content: Option<String>,
    /// Variable names to remove.
    pub delete_variables: Vec<String>,
    /// Keep existing variables that are not mentioned.
    pub preserve_existing: bool,
}

/// Options for creating or updating `const` declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Constants to ensure exist.
    pub constants: Vec<ValueDef>,
    /// Raw `const` declarations.
    pub content: Option<String>,
    /// Constant names to remove.
    pub delete_constants: Vec<String>,
    /// Keep existing constants that are not mentioned.
    pub preserve_existing: bool,
}

/// Options for creating or updating non-struct `type` declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeOptions {
    /// Target file.
    pub file_name: PathBuf,
    /// Types to ensure exist.
    pub types: Vec<TypeDef>,
    /// Raw `type` declarations.
    pub content: Option<String>,
    /// Type names to remove.
    pub delete_types: Vec<String>,
    /// Keep existing types that are not mentioned.
    pub preserve_existing: bool,
}

macro_rules! preserving_default {
    ($record:ident, $items:ident, $deletes:ident) => {
        impl Default for $record {
            fn default() -> Self {
                Self {
                    file_name: PathBuf::new(),
                    $items: Vec::new(),
                    content: None,
                    $deletes: Vec::new(),
                    preserve_existing: true,
                }
            }
        }
    };
}

preserving_default!(VariableOptions, variables, delete_variables);
preserving_default!(ConstantOptions, constants, delete_constants);
preserving_default!(TypeOptions, types, delete_types);

/// Desired state of a struct body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructBody {
    /// Ensure, delete and optionally preserve fields.
    Fields {
        /// Fields to ensure.
        ensure: Vec<Field>,
        /// Field names to remove.
        delete: Vec<String>,
        /// Keep unmentioned fields.
        preserve_existing: bool,
    },
    /// A raw field list merged into the struct, keeping existing fields.
    Raw(String),
}

/// Validated struct spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructSpec {
    /// Struct name.
    pub name: String,
    /// Desired body.
    pub body: StructBody,
}

/// Desired form of a function or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallableForm {
    /// Synthesised from parts.
    Structured {
        /// Parameters in order.
        parameters: Vec<Parameter>,
        /// Result list, if any.
        result: Option<String>,
        /// Body statements.
        body: String,
    },
    /// Raw text following the name.
    Raw(String),
}

/// Validated method receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverSpec {
    /// Receiver variable name.
    pub name: String,
    /// Receiver type as written.
    pub type_expr: String,
}

/// Validated function or method spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableSpec {
    /// Function or method name.
    pub name: String,
    /// Receiver, for methods.
    pub receiver: Option<ReceiverSpec>,
    /// Desired form.
    pub form: CallableForm,
}

/// Desired state of a set of `var`/`const`/`type` specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntriesForm<T> {
    /// Upsert, delete and optionally preserve entries.
    Structured {
        /// Entries to ensure.
        ensure: Vec<T>,
        /// Names to remove.
        delete: Vec<String>,
        /// Keep unmentioned entries of the same kind.
        preserve_existing: bool,
    },
    /// Raw declarations.
    Raw(String),
}

/// Validated `var`/`const` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesSpec {
    /// `var` or `const`.
    pub kind: ValueKind,
    /// Desired state.
    pub form: EntriesForm<ValueDef>,
}

/// Validated `type` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypesSpec {
    /// Desired state.
    pub form: EntriesForm<TypeDef>,
}

/// A validated desired-state description of one declaration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationSpec {
    /// A struct.
    Struct(StructSpec),
    /// A package-level function.
    Function(CallableSpec),
    /// A method.
    Method(CallableSpec),
    /// Variables or constants.
    Values(ValuesSpec),
    /// Type declarations.
    Types(TypesSpec),
}

/// Option records accepted by [`Project`](crate::Project).
pub trait DeclarationOptions {
    /// Returns the target file.
    fn file_name(&self) -> &Path;

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the record is contradictory or
    /// incomplete.
    fn validate(&self) -> Result<DeclarationSpec>;
}

fn require_file(file_name: &Path) -> Result<()> {
    if file_name.as_os_str().is_empty() {
        return Err(Error::validation("file name is required"));
    }
    Ok(())
}

fn require_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation(format!("{kind} name is required")));
    }
    Ok(())
}

fn raw_content(content: Option<&String>) -> Option<&str> {
    content.map(String::as_str).filter(|text| !text.trim().is_empty())
}

fn exclusive(label: &str, structured: bool, content: Option<&str>) -> Result<()> {
    match (structured, content) {
        (true, Some(_)) => Err(Error::validation(format!(
            "{label} and content are mutually exclusive"
        ))),
        (false, None) => Err(Error::validation(format!(
            "must provide either {label} or content"
        ))),
        _ => Ok(()),
    }
}

impl DeclarationOptions for StructOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let content = raw_content(self.content.as_ref());
        let structured = !self.fields.is_empty() || !self.delete_fields.is_empty();
        exclusive("fields", structured, content)?;
        require_file(&self.file_name)?;
        require_name("struct", &self.name)?;
        if let Some(field) = self.fields.iter().find(|f| f.name.trim().is_empty()) {
            return Err(Error::validation(format!(
                "field of type `{}` has no name",
                field.type_expr
            )));
        }
        let body = match content {
            Some(text) => StructBody::Raw(text.to_owned()),
            None => StructBody::Fields {
                ensure: self.fields.clone(),
                delete: self.delete_fields.clone(),
                preserve_existing: self.preserve_existing,
            },
        };
        Ok(DeclarationSpec::Struct(StructSpec {
            name: self.name.trim().to_owned(),
            body,
        }))
    }
}

fn callable_form(
    parameters: &[Parameter],
    return_type: &str,
    body: &str,
    content: Option<&String>,
) -> Result<CallableForm> {
    let content = raw_content(content);
    let structured =
        !parameters.is_empty() || !return_type.trim().is_empty() || !body.trim().is_empty();
    exclusive("parameters/return type/body", structured, content)?;
    Ok(match content {
        Some(text) => CallableForm::Raw(text.to_owned()),
        None => CallableForm::Structured {
            parameters: parameters.to_vec(),
            result: Some(return_type.trim().to_owned()).filter(|r| !r.is_empty()),
            body: body.to_owned(),
        },
    })
}

impl DeclarationOptions for FunctionOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let form = callable_form(
            &self.parameters,
            &self.return_type,
            &self.body,
            self.content.as_ref(),
        )?;
        require_file(&self.file_name)?;
        require_name("function", &self.name)?;
        Ok(DeclarationSpec::Function(CallableSpec {
            name: self.name.trim().to_owned(),
            receiver: None,
            form,
        }))
    }
}

impl DeclarationOptions for MethodOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let form = callable_form(
            &self.parameters,
            &self.return_type,
            &self.body,
            self.content.as_ref(),
        )?;
        require_file(&self.file_name)?;
        require_name("method", &self.name)?;
        if self.receiver_type.trim().is_empty() {
            return Err(Error::validation("receiver type is required for methods"));
        }
        let receiver_name = if self.receiver_name.trim().is_empty() {
            crate::codegen::default_receiver_name(&self.receiver_type)
        } else {
            self.receiver_name.trim().to_owned()
        };
        Ok(DeclarationSpec::Method(CallableSpec {
            name: self.name.trim().to_owned(),
            receiver: Some(ReceiverSpec {
                name: receiver_name,
                type_expr: self.receiver_type.trim().to_owned(),
            }),
            form,
        }))
    }
}

fn entries_form<T: Clone>(
    label: &str,
    items: &[T],
    deletes: &[String],
    preserve_existing: bool,
    content: Option<&String>,
) -> Result<EntriesForm<T>> {
    let content = raw_content(content);
    exclusive(label, !items.is_empty() || !deletes.is_empty(), content)?;
    Ok(match content {
        Some(text) => EntriesForm::Raw(text.to_owned()),
        None => EntriesForm::Structured {
            ensure: items.to_vec(),
            delete: deletes.to_vec(),
            preserve_existing,
        },
    })
}

fn require_entry_names<'a>(label: &str, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    if names.into_iter().any(|name| name.trim().is_empty()) {
        return Err(Error::validation(format!("{label} name is required")));
    }
    Ok(())
}

impl DeclarationOptions for VariableOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let form = entries_form(
            "variables",
            &self.variables,
            &self.delete_variables,
            self.preserve_existing,
            self.content.as_ref(),
        )?;
        require_file(&self.file_name)?;
        require_entry_names("variable", self.variables.iter().map(|v| v.name.as_str()))?;
        Ok(DeclarationSpec::Values(ValuesSpec {
            kind: ValueKind::Var,
            form,
        }))
    }
}

impl DeclarationOptions for ConstantOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let form = entries_form(
            "constants",
            &self.constants,
            &self.delete_constants,
            self.preserve_existing,
            self.content.as_ref(),
        )?;
        require_file(&self.file_name)?;
        require_entry_names("constant", self.constants.iter().map(|c| c.name.as_str()))?;
        if let Some(constant) = self.constants.iter().find(|c| c.value.trim().is_empty()) {
            return Err(Error::validation(format!(
                "constant `{}` needs a value",
                constant.name
            )));
        }
        Ok(DeclarationSpec::Values(ValuesSpec {
            kind: ValueKind::Const,
            form,
        }))
    }
}

impl DeclarationOptions for TypeOptions {
    fn file_name(&self) -> &Path {
        &self.file_name
    }

    fn validate(&self) -> Result<DeclarationSpec> {
        let form = entries_form(
            "types",
            &self.types,
            &self.delete_types,
            self.preserve_existing,
            self.content.as_ref(),
        )?;
        require_file(&self.file_name)?;
        require_entry_names("type", self.types.iter().map(|t| t.name.as_str()))?;
        if let Some(def) = self.types.iter().find(|t| t.definition.trim().is_empty()) {
            return Err(Error::validation(format!(
                "type `{}` needs a definition",
                def.name
            )));
        }
        Ok(DeclarationSpec::Types(TypesSpec { form }))
    }
}
