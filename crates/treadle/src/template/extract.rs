//! Conversions from template declarations to option records.

use std::path::PathBuf;

use crate::error::Result;
use crate::model::{FunctionDecl, ValueDecl};
use crate::spec::{
    ConstantOptions, Field, FunctionOptions, MethodOptions, StructOptions, TypeDef, TypeOptions,
    ValueDef, VariableOptions,
};

use super::Template;

impl Template {
    /// Returns struct `name` as options that recreate its named fields.
    ///
    /// Embedded fields are skipped. The target file is left empty for the
    /// caller to choose.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the struct
    /// does not exist.
    pub fn extract_struct(&self, name: &str) -> Result<StructOptions> {
        let decl = self.sources.require_struct(name)?;
        let fields = decl
            .fields
            .iter()
            .filter(|field| !field.embedded)
            .map(|field| Field {
                name: field.name.clone(),
                type_expr: field.type_expr.clone(),
                annotation: field.tag.clone().unwrap_or_default(),
            })
            .collect();
        Ok(StructOptions {
            file_name: PathBuf::new(),
            name: decl.name,
            fields,
            ..StructOptions::default()
        })
    }

    /// Returns function `name` as options.
    ///
    /// Generic functions are returned as raw content so their type
    /// parameters survive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the function
    /// does not exist.
    pub fn extract_function(&self, name: &str) -> Result<FunctionOptions> {
        let decl = self.sources.require_function(name)?;
        if let Some(content) = self.generic_tail(&decl, "function_declaration")? {
            return Ok(FunctionOptions {
                name: decl.name,
                content: Some(content),
                ..FunctionOptions::default()
            });
        }
        Ok(FunctionOptions {
            file_name: PathBuf::new(),
            name: decl.name,
            parameters: decl.parameters,
            return_type: decl.result.unwrap_or_default(),
            body: decl.body.unwrap_or_default(),
            content: None,
        })
    }

    /// Returns method `name` on `receiver` as options.
    ///
    /// `receiver` matches with or without pointer indirection; the options
    /// carry the receiver as the declaration writes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the method
    /// does not exist.
    pub fn extract_method(&self, receiver: &str, name: &str) -> Result<MethodOptions> {
        let decl = self.sources.require_method(receiver, name)?;
        let (receiver_name, receiver_type) = decl
            .receiver
            .as_ref()
            .map(|recv| (recv.name.clone().unwrap_or_default(), recv.type_expr.clone()))
            .unwrap_or_default();
        Ok(MethodOptions {
            file_name: PathBuf::new(),
            name: decl.name,
            receiver_name,
            receiver_type,
            parameters: decl.parameters,
            return_type: decl.result.unwrap_or_default(),
            body: decl.body.unwrap_or_default(),
            content: None,
        })
    }

    /// Returns variable `name` as options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the variable
    /// does not exist.
    pub fn extract_variable(&self, name: &str) -> Result<VariableOptions> {
        let decl = self.sources.require_variable(name)?;
        Ok(VariableOptions {
            variables: vec![value_def(decl)],
            ..VariableOptions::default()
        })
    }

    /// Returns constant `name` as options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when the constant
    /// does not exist.
    pub fn extract_constant(&self, name: &str) -> Result<ConstantOptions> {
        let decl = self.sources.require_constant(name)?;
        Ok(ConstantOptions {
            constants: vec![value_def(decl)],
            ..ConstantOptions::default()
        })
    }

    /// Returns type `name` as options.
    ///
    /// Aliases keep their leading `=`. A struct is returned with its full
    /// `struct { ... }` definition; generic types become raw content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) when neither a
    /// type nor a struct is named `name`.
    pub fn extract_type(&self, name: &str) -> Result<TypeOptions> {
        let (type_parameters, definition) = match self.sources.find_type(name) {
            Some(decl) => {
                let definition = if decl.alias {
                    format!("= {}", decl.definition)
                } else {
                    decl.definition
                };
                (decl.type_parameters, definition)
            }
            None => {
                let decl = self.sources.require_struct(name)?;
                let doc = self.sources.require_file(&decl.path)?;
                let text = doc
                    .source()
                    .get(decl.type_span.clone())
                    .unwrap_or_default()
                    .to_owned();
                (decl.type_parameters, text)
            }
        };
        Ok(match type_parameters {
            Some(params) => TypeOptions {
                content: Some(format!("type {name}{params} {definition}\n")),
                ..TypeOptions::default()
            },
            None => TypeOptions {
                types: vec![TypeDef::new(name, definition)],
                ..TypeOptions::default()
            },
        })
    }

    /// Text after the name of a generic callable, or `None` when it has no
    /// type parameters.
    fn generic_tail(&self, decl: &FunctionDecl, kind: &str) -> Result<Option<String>> {
        if decl.type_parameters.is_none() {
            return Ok(None);
        }
        let name_span = self.sources.name_span(decl, kind)?;
        let doc = self.sources.require_file(&decl.path)?;
        Ok(doc
            .source()
            .get(name_span.end..decl.span.end)
            .map(str::to_owned))
    }
}

fn value_def(decl: ValueDecl) -> ValueDef {
    ValueDef {
        name: decl.name,
        type_expr: decl.type_expr.unwrap_or_default(),
        value: decl.value.unwrap_or_default(),
    }
}
