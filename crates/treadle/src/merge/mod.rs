//! Reconciles a [`DeclarationSpec`] against the current content of a file.
//!
//! The engine is pure: it takes the existing text (if any) and returns the
//! new text together with whether anything changed. Persisting the result is
//! the job of [`SafeApply`](crate::apply::SafeApply).

mod callables;
mod entries;
mod structs;

use std::path::Path;

use tracing::debug;
use treadle_syntax::Document;

use crate::codegen;
use crate::error::Result;
use crate::spec::DeclarationSpec;

const MERGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::merge");

/// Result of reconciling one spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Content the file should hold afterwards.
    pub content: String,
    /// Whether `content` differs from what was there before.
    pub changed: bool,
    /// Whether the file did not exist before.
    pub created: bool,
}

/// Reconciles `spec` against `existing`, the current content of `path`.
///
/// New files start from a `package` clause naming `package`.
///
/// # Errors
///
/// Returns [`Error::Syntax`](crate::Error::Syntax) when the existing file or
/// injected raw content does not parse, and
/// [`Error::Validation`](crate::Error::Validation) when a request cannot be
/// expressed against the existing declarations.
pub fn reconcile(
    existing: Option<&str>,
    path: &Path,
    spec: &DeclarationSpec,
    package: &str,
) -> Result<MergeOutcome> {
    let created = existing.is_none();
    let original = match existing {
        Some(text) => text.to_owned(),
        None => format!("package {package}\n"),
    };
    let mut doc = Document::parse(path, original.clone())?;
    match spec {
        DeclarationSpec::Struct(spec) => structs::reconcile(&mut doc, spec)?,
        DeclarationSpec::Function(spec) | DeclarationSpec::Method(spec) => {
            callables::reconcile(&mut doc, spec)?;
        }
        DeclarationSpec::Values(spec) => entries::reconcile_values(&mut doc, spec)?,
        DeclarationSpec::Types(spec) => entries::reconcile_types(&mut doc, spec)?,
    }
    let content = doc.render();
    let changed = created || content != original;
    if !changed {
        debug!(
            target: MERGE_TARGET,
            file = %path.display(),
            "declaration already up to date"
        );
    }
    Ok(MergeOutcome {
        content,
        changed,
        created,
    })
}

/// Appends a rendered declaration to the end of `doc`.
fn append(doc: &mut Document, declaration: &str) -> Result<()> {
    let source = codegen::append_declaration(doc.source(), declaration);
    doc.replace_source(source)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use super::*;
    use crate::model::Parameter;
    use crate::spec::{
        DeclarationOptions, Field, FunctionOptions, MethodOptions, StructOptions, TypeDef,
        TypeOptions, ValueDef, VariableOptions,
    };

    fn merge(existing: Option<&str>, options: &impl DeclarationOptions) -> MergeOutcome {
        let spec = options.validate().expect("valid options");
        reconcile(existing, Path::new("models.go"), &spec, "models").expect("merge")
    }

    fn user_options(fields: Vec<Field>, preserve_existing: bool) -> StructOptions {
        StructOptions {
            file_name: "models.go".into(),
            name: "User".into(),
            fields,
            preserve_existing,
            ..StructOptions::default()
        }
    }

    #[test]
    fn new_file_gets_package_and_struct() {
        let outcome = merge(
            None,
            &user_options(
                vec![Field::new("ID", "string"), Field::new("Name", "string")],
                false,
            ),
        );
        assert!(outcome.created);
        assert_eq!(
            outcome.content,
            "package models\n\ntype User struct {\n\tID   string\n\tName string\n}\n"
        );
    }

    #[test]
    fn reapplying_a_preserving_spec_changes_nothing() {
        let options = user_options(vec![Field::new("ID", "string")], true);
        let first = merge(None, &options);
        let second = merge(Some(&first.content), &options);
        assert!(!second.changed);
        assert_eq!(second.content, first.content);
    }

    #[test]
    fn missing_struct_is_appended_to_existing_file() {
        let existing = "package models\n\nvar version = 1\n";
        let outcome = merge(Some(existing), &user_options(vec![Field::new("ID", "int")], true));
        assert_eq!(
            outcome.content,
            "package models\n\nvar version = 1\n\ntype User struct {\n\tID int\n}\n"
        );
    }

    #[test]
    fn unparseable_existing_file_is_rejected() {
        let spec = user_options(vec![Field::new("ID", "int")], true)
            .validate()
            .expect("valid");
        let err = reconcile(Some("package models\n\ntype {"), Path::new("m.go"), &spec, "m")
            .expect_err("broken source");
        assert!(err.is_syntax());
    }

    #[test]
    fn function_is_synthesised_with_tab_indented_body() {
        let options = FunctionOptions {
            file_name: "util.go".into(),
            name: "Add".into(),
            parameters: vec![Parameter::new("a", "int"), Parameter::new("b", "int")],
            return_type: "int".into(),
            body: "return a + b".into(),
            ..FunctionOptions::default()
        };
        let outcome = merge(Some("package util\n"), &options);
        assert_eq!(
            outcome.content,
            "package util\n\nfunc Add(a int, b int) int {\n\treturn a + b\n}\n"
        );
    }

    #[test]
    fn method_with_same_name_replaces_existing_declaration() {
        let existing = "package models\n\n// Greet says hello.\nfunc (u *User) Greet() string {\n\treturn \"hi\"\n}\n";
        let options = MethodOptions {
            file_name: "models.go".into(),
            name: "Greet".into(),
            receiver_type: "User".into(),
            return_type: "string".into(),
            body: "return \"hello \" + u.Name".into(),
            ..MethodOptions::default()
        };
        let outcome = merge(Some(existing), &options);
        assert_eq!(
            outcome.content,
            "package models\n\n// Greet says hello.\nfunc (u User) Greet() string {\n\treturn \"hello \" + u.Name\n}\n"
        );
    }

    #[rstest]
    #[case(true, "package models\n\nvar (\n\tdebug = true\n\tlevel = 3\n)\n")]
    #[case(false, "package models\n\nvar (\n\tlevel = 3\n)\n")]
    fn variables_upsert_and_honour_preserve(#[case] preserve_existing: bool, #[case] expected: &str) {
        let existing = "package models\n\nvar (\n\tdebug = false\n\tlevel = 1\n)\n";
        let mut variables = vec![ValueDef::new("level", "", "3")];
        if preserve_existing {
            variables.insert(0, ValueDef::new("debug", "", "true"));
        }
        let options = VariableOptions {
            file_name: "models.go".into(),
            variables,
            preserve_existing,
            ..VariableOptions::default()
        };
        assert_eq!(merge(Some(existing), &options).content, expected);
    }

    #[test]
    fn types_are_appended_as_one_group() {
        let options = TypeOptions {
            file_name: "models.go".into(),
            types: vec![TypeDef::new("ID", "string"), TypeDef::new("Count", "int")],
            ..TypeOptions::default()
        };
        assert_eq!(
            merge(Some("package models\n"), &options).content,
            "package models\n\ntype (\n\tID    string\n\tCount int\n)\n"
        );
    }
}
