//! `var`, `const` and `type` reconciliation.
//!
//! Entries are upserted by name. Each edit reparses the document, so the
//! snapshots used to locate a spec are always taken after the previous edit.

use std::collections::HashSet;

use tracing::debug;
use treadle_syntax::node::{named_children, node_text};
use treadle_syntax::{Document, Node, TextEdit};

use super::{MERGE_TARGET, append};
use crate::codegen;
use crate::edits;
use crate::error::{Error, Result};
use crate::model::{Declaration, SpecSite, TypeDecl, ValueDecl, ValueKind, declarations};
use crate::spec::{EntriesForm, TypeDef, TypesSpec, ValueDef, ValuesSpec};

fn non_empty(text: &str) -> Option<&str> {
    Some(text.trim()).filter(|t| !t.is_empty())
}

fn find_value(doc: &Document, kind: ValueKind, name: &str) -> Option<ValueDecl> {
    declarations(doc).into_iter().find_map(|decl| match decl {
        Declaration::Variable(found) | Declaration::Constant(found)
            if found.kind == kind && found.name == name =>
        {
            Some(found)
        }
        _ => None,
    })
}

fn value_names(doc: &Document, kind: ValueKind) -> Vec<String> {
    declarations(doc)
        .into_iter()
        .filter_map(|decl| match decl {
            Declaration::Variable(found) | Declaration::Constant(found) if found.kind == kind => {
                Some(found.name)
            }
            _ => None,
        })
        .collect()
}

/// Text of a spec with `name` taken out of its name list.
fn spec_without(existing: &ValueDecl) -> Result<String> {
    let site = &existing.spec;
    let index = site
        .names
        .iter()
        .position(|n| *n == existing.name)
        .unwrap_or_default();
    let names: Vec<&str> = site
        .names
        .iter()
        .filter(|n| **n != existing.name)
        .map(String::as_str)
        .collect();
    let values: Vec<&str> = match site.values.len() {
        0 => Vec::new(),
        n if n == site.names.len() => site
            .values
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, v)| v.as_str())
            .collect(),
        _ => {
            return Err(Error::validation(format!(
                "cannot separate `{}` from a multi-value {} specification",
                existing.name,
                existing.kind.keyword()
            )));
        }
    };
    let joined = values.join(", ");
    Ok(codegen::value_spec(
        &names.join(", "),
        existing.type_expr.as_deref(),
        non_empty(&joined),
    ))
}

/// Edit deleting a whole specification, or its whole declaration when it is
/// the only one.
fn spec_removal(doc: &Document, site: &SpecSite) -> TextEdit {
    let span = site.removal_span();
    if span == site.decl_span {
        edits::remove_top_level(doc, &span)
    } else {
        TextEdit::delete(edits::line_removal(doc.source(), span))
    }
}

fn delete_value(doc: &mut Document, kind: ValueKind, name: &str) -> Result<bool> {
    let Some(existing) = find_value(doc, kind, name) else {
        return Ok(false);
    };
    let edit = if existing.spec.names.len() > 1 {
        TextEdit::replace(existing.spec.span.clone(), spec_without(&existing)?)
    } else {
        spec_removal(doc, &existing.spec)
    };
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name,
        "removing {}",
        kind.keyword()
    );
    edits::apply(doc, &[edit])?;
    Ok(true)
}

/// Updates `def` in place, or queues it for appending when absent.
fn upsert_value(
    doc: &mut Document,
    kind: ValueKind,
    def: &ValueDef,
    pending: &mut Vec<Vec<String>>,
) -> Result<()> {
    let name = def.name.trim();
    let type_expr = non_empty(&def.type_expr);
    let value = non_empty(&def.value);
    let Some(existing) = find_value(doc, kind, name) else {
        pending.push(codegen::value_cells(name, type_expr, value));
        return Ok(());
    };
    if existing.type_expr.as_deref() == type_expr && existing.value.as_deref() == value {
        return Ok(());
    }
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name,
        "updating {}",
        kind.keyword()
    );
    if existing.spec.names.len() == 1 {
        let replacement = codegen::value_spec(name, type_expr, value);
        edits::apply(doc, &[TextEdit::replace(existing.spec.span, replacement)])?;
    } else {
        let remaining = spec_without(&existing)?;
        edits::apply(doc, &[TextEdit::replace(existing.spec.span.clone(), remaining)])?;
        pending.push(codegen::value_cells(name, type_expr, value));
    }
    Ok(())
}

fn append_pending(doc: &mut Document, keyword: &str, pending: &[Vec<String>]) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    append(doc, &codegen::grouped_declaration(keyword, pending))
}

pub(super) fn reconcile_values(doc: &mut Document, spec: &ValuesSpec) -> Result<()> {
    let (ensure, delete, preserve_existing) = match &spec.form {
        EntriesForm::Structured {
            ensure,
            delete,
            preserve_existing,
        } => (ensure.clone(), delete.clone(), *preserve_existing),
        EntriesForm::Raw(content) => match raw_values(doc, spec.kind, content)? {
            Some(ensure) => (ensure, Vec::new(), true),
            None => return Ok(()),
        },
    };
    let keyword = spec.kind.keyword();
    let mut pending = Vec::new();
    for def in &ensure {
        upsert_value(doc, spec.kind, def, &mut pending)?;
    }
    for name in &delete {
        delete_value(doc, spec.kind, name.trim())?;
    }
    pending.retain(|cells| {
        cells
            .first()
            .is_none_or(|name| !delete.iter().any(|d| d.trim() == name))
    });
    if !preserve_existing {
        let wanted: HashSet<&str> = ensure.iter().map(|def| def.name.trim()).collect();
        for name in value_names(doc, spec.kind) {
            if !wanted.contains(name.as_str()) {
                delete_value(doc, spec.kind, &name)?;
            }
        }
    }
    append_pending(doc, keyword, &pending)
}

/// Parses raw declarations into a scratch package.
fn parse_scratch(content: &str) -> Result<Document> {
    Ok(Document::parse(
        "content",
        format!("package scratch\n\n{}\n", content.trim()),
    )?)
}

/// Returns the declarations of `scratch`, checking they are all of
/// `node_kind`.
fn raw_declarations<'doc>(
    scratch: &'doc Document,
    node_kind: &str,
    keyword: &str,
) -> Result<Vec<Node<'doc>>> {
    let mut found = Vec::new();
    for node in named_children(scratch.root_node()) {
        match node.kind() {
            "package_clause" | "comment" => {}
            kind if kind == node_kind => found.push(node),
            _ => {
                return Err(Error::validation(format!(
                    "content may only contain {keyword} declarations, found `{}`",
                    node_text(node, scratch.source()).lines().next().unwrap_or_default()
                )));
            }
        }
    }
    if found.is_empty() {
        return Err(Error::validation(format!(
            "content has no {keyword} declarations"
        )));
    }
    Ok(found)
}

/// Text of a raw declaration including its doc comment, reparsed on its own.
fn raw_piece(scratch: &Document, node: Node<'_>) -> Result<(String, Document)> {
    let text = scratch
        .source()
        .get(edits::doc_comment_start(node)..node.end_byte())
        .unwrap_or_default()
        .to_owned();
    let piece = Document::parse("content", format!("package scratch\n\n{text}\n"))?;
    Ok((text, piece))
}

/// Appends raw declarations whose names are all new verbatim and converts
/// the rest into upserts.
fn raw_values(doc: &mut Document, kind: ValueKind, content: &str) -> Result<Option<Vec<ValueDef>>> {
    let keyword = kind.keyword();
    let node_kind = format!("{keyword}_declaration");
    let scratch = parse_scratch(content)?;
    let mut upserts = Vec::new();
    for node in raw_declarations(&scratch, &node_kind, keyword)? {
        let (text, piece) = raw_piece(&scratch, node)?;
        let found: Vec<ValueDecl> = declarations(&piece)
            .into_iter()
            .filter_map(|decl| match decl {
                Declaration::Variable(v) | Declaration::Constant(v) => Some(v),
                _ => None,
            })
            .collect();
        if found.iter().all(|v| find_value(doc, kind, &v.name).is_none()) {
            append(doc, &text)?;
            continue;
        }
        for value in found {
            if !value.spec.values.is_empty() && value.spec.values.len() != value.spec.names.len() {
                return Err(Error::validation(format!(
                    "cannot separate `{}` from a multi-value {keyword} specification",
                    value.name
                )));
            }
            upserts.push(ValueDef::new(
                value.name,
                value.type_expr.unwrap_or_default(),
                value.value.unwrap_or_default(),
            ));
        }
    }
    Ok((!upserts.is_empty()).then_some(upserts))
}

enum TypeSite {
    Alias(TypeDecl),
    Struct { span: std::ops::Range<usize>, type_parameters: Option<String> },
}

fn find_type(doc: &Document, name: &str) -> Option<TypeSite> {
    declarations(doc).into_iter().find_map(|decl| match decl {
        Declaration::TypeAlias(found) if found.name == name => Some(TypeSite::Alias(found)),
        Declaration::Struct(found) if found.name == name => Some(TypeSite::Struct {
            span: found.spec_span,
            type_parameters: found.type_parameters,
        }),
        _ => None,
    })
}

fn alias_names(doc: &Document) -> Vec<String> {
    declarations(doc)
        .into_iter()
        .filter_map(|decl| match decl {
            Declaration::TypeAlias(found) => Some(found.name),
            _ => None,
        })
        .collect()
}

fn written_definition(decl: &TypeDecl) -> String {
    if decl.alias {
        format!("= {}", decl.definition)
    } else {
        decl.definition.clone()
    }
}

fn upsert_type(doc: &mut Document, def: &TypeDef, pending: &mut Vec<TypeDef>) -> Result<()> {
    let name = def.name.trim();
    let definition = def.definition.trim();
    let (span, type_parameters) = match find_type(doc, name) {
        None => {
            pending.push(TypeDef::new(name, definition));
            return Ok(());
        }
        Some(TypeSite::Alias(existing)) => {
            if written_definition(&existing) == definition {
                return Ok(());
            }
            (existing.spec.span, existing.type_parameters)
        }
        Some(TypeSite::Struct {
            span,
            type_parameters,
        }) => {
            if doc
                .source()
                .get(span.clone())
                .is_some_and(|text| text.strip_prefix(name).map(str::trim) == Some(definition))
            {
                return Ok(());
            }
            (span, type_parameters)
        }
    };
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name,
        "updating type"
    );
    let declared = format!("{name}{}", type_parameters.unwrap_or_default());
    let replacement = codegen::type_spec(&declared, definition);
    edits::apply(doc, &[TextEdit::replace(span, replacement)])?;
    Ok(())
}

fn delete_type(doc: &mut Document, name: &str) -> Result<bool> {
    let Some(TypeSite::Alias(existing)) = find_type(doc, name) else {
        return Ok(false);
    };
    debug!(
        target: MERGE_TARGET,
        file = %doc.path().display(),
        name,
        "removing type"
    );
    let edit = spec_removal(doc, &existing.spec);
    edits::apply(doc, &[edit])?;
    Ok(true)
}

fn append_types(doc: &mut Document, pending: &[TypeDef]) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    if pending.iter().any(|def| def.definition.contains('\n')) {
        for def in pending {
            append(doc, &format!("type {}", codegen::type_spec(&def.name, &def.definition)))?;
        }
        return Ok(());
    }
    let rows: Vec<Vec<String>> = pending
        .iter()
        .map(|def| {
            let spec = codegen::type_spec(&def.name, &def.definition);
            let definition = spec.get(def.name.len()..).unwrap_or_default().trim().to_owned();
            vec![def.name.clone(), definition]
        })
        .collect();
    append(doc, &codegen::grouped_declaration("type", &rows))
}

pub(super) fn reconcile_types(doc: &mut Document, spec: &TypesSpec) -> Result<()> {
    let (ensure, delete, preserve_existing) = match &spec.form {
        EntriesForm::Structured {
            ensure,
            delete,
            preserve_existing,
        } => (ensure.clone(), delete.clone(), *preserve_existing),
        EntriesForm::Raw(content) => match raw_types(doc, content)? {
            Some(ensure) => (ensure, Vec::new(), true),
            None => return Ok(()),
        },
    };
    let mut pending = Vec::new();
    for def in &ensure {
        upsert_type(doc, def, &mut pending)?;
    }
    for name in &delete {
        delete_type(doc, name.trim())?;
    }
    pending.retain(|def| !delete.iter().any(|d| d.trim() == def.name));
    if !preserve_existing {
        let wanted: HashSet<&str> = ensure.iter().map(|def| def.name.trim()).collect();
        for name in alias_names(doc) {
            if !wanted.contains(name.as_str()) {
                delete_type(doc, &name)?;
            }
        }
    }
    append_types(doc, &pending)
}

fn raw_types(doc: &mut Document, content: &str) -> Result<Option<Vec<TypeDef>>> {
    let scratch = parse_scratch(content)?;
    let mut upserts = Vec::new();
    for node in raw_declarations(&scratch, "type_declaration", "type")? {
        let (text, piece) = raw_piece(&scratch, node)?;
        let found: Vec<TypeDef> = declarations(&piece)
            .into_iter()
            .filter_map(|decl| match decl {
                Declaration::TypeAlias(t) => Some(TypeDef::new(t.name.clone(), written_definition(&t))),
                Declaration::Struct(s) => {
                    let definition = piece.source().get(s.type_span.clone()).unwrap_or_default();
                    Some(TypeDef::new(s.name.clone(), definition))
                }
                _ => None,
            })
            .collect();
        if found.iter().all(|t| find_type(doc, &t.name).is_none()) {
            append(doc, &text)?;
            continue;
        }
        upserts.extend(found);
    }
    Ok((!upserts.is_empty()).then_some(upserts))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use crate::merge::reconcile;
    use crate::spec::{
        ConstantOptions, DeclarationOptions, TypeDef, TypeOptions, ValueDef, VariableOptions,
    };

    fn merge(existing: &str, options: &impl DeclarationOptions) -> String {
        let spec = options.validate().expect("valid");
        reconcile(Some(existing), Path::new("c.go"), &spec, "c")
            .expect("merge")
            .content
    }

    fn constants(constants: Vec<ValueDef>, delete: &[&str]) -> ConstantOptions {
        ConstantOptions {
            file_name: "c.go".into(),
            constants,
            delete_constants: delete.iter().map(|d| (*d).to_owned()).collect(),
            ..ConstantOptions::default()
        }
    }

    #[rstest]
    #[case::update_single(
        "package c\n\nconst Max = 1\n",
        vec![ValueDef::new("Max", "", "2")],
        &[],
        "package c\n\nconst Max = 2\n"
    )]
    #[case::unchanged(
        "package c\n\nconst Max int = 1\n",
        vec![ValueDef::new("Max", "int", "1")],
        &[],
        "package c\n\nconst Max int = 1\n"
    )]
    #[case::delete_from_group(
        "package c\n\nconst (\n\tA = 1\n\tB = 2\n)\n",
        Vec::new(),
        &["A"],
        "package c\n\nconst (\n\tB = 2\n)\n"
    )]
    #[case::delete_last_spec_removes_declaration(
        "package c\n\nconst A = 1\n\nfunc f() {}\n",
        Vec::new(),
        &["A"],
        "package c\n\nfunc f() {}\n"
    )]
    #[case::split_multi_name(
        "package c\n\nconst A, B = 1, 2\n",
        vec![ValueDef::new("B", "", "3")],
        &[],
        "package c\n\nconst A = 1\n\nconst B = 3\n"
    )]
    fn constants_reconcile(
        #[case] existing: &str,
        #[case] ensure: Vec<ValueDef>,
        #[case] delete: &[&str],
        #[case] expected: &str,
    ) {
        assert_eq!(merge(existing, &constants(ensure, delete)), expected);
    }

    #[test]
    fn unsplittable_multi_value_spec_is_a_validation_error() {
        let options = VariableOptions {
            file_name: "c.go".into(),
            variables: vec![ValueDef::new("b", "", "3")],
            ..VariableOptions::default()
        };
        let spec = options.validate().expect("valid");
        let err = reconcile(
            Some("package c\n\nvar a, b = pair()\n"),
            Path::new("c.go"),
            &spec,
            "c",
        )
        .expect_err("unsplittable");
        assert!(err.is_validation());
    }

    #[test]
    fn raw_values_with_new_names_are_appended_verbatim() {
        let options = VariableOptions {
            file_name: "c.go".into(),
            content: Some("// registry holds handlers.\nvar registry = map[string]int{}".into()),
            ..VariableOptions::default()
        };
        assert_eq!(
            merge("package c\n", &options),
            "package c\n\n// registry holds handlers.\nvar registry = map[string]int{}\n"
        );
    }

    #[test]
    fn raw_values_with_known_names_update_in_place() {
        let options = VariableOptions {
            file_name: "c.go".into(),
            content: Some("var level = 5".into()),
            ..VariableOptions::default()
        };
        assert_eq!(
            merge("package c\n\nvar level = 1\n", &options),
            "package c\n\nvar level = 5\n"
        );
    }

    #[test]
    fn raw_content_of_the_wrong_kind_is_rejected() {
        let options = ConstantOptions {
            file_name: "c.go".into(),
            content: Some("var x = 1".into()),
            ..ConstantOptions::default()
        };
        let spec = options.validate().expect("valid");
        let err = reconcile(Some("package c\n"), Path::new("c.go"), &spec, "c").expect_err("kind");
        assert!(err.is_validation());
    }

    #[rstest]
    #[case::update("package c\n\ntype ID int\n", "ID", "string", "package c\n\ntype ID string\n")]
    #[case::alias("package c\n\ntype ID int\n", "ID", "= int64", "package c\n\ntype ID = int64\n")]
    #[case::replace_struct(
        "package c\n\ntype Point struct {\n\tX int\n}\n",
        "Point",
        "[2]int",
        "package c\n\ntype Point [2]int\n"
    )]
    fn types_upsert(
        #[case] existing: &str,
        #[case] name: &str,
        #[case] definition: &str,
        #[case] expected: &str,
    ) {
        let options = TypeOptions {
            file_name: "c.go".into(),
            types: vec![TypeDef::new(name, definition)],
            ..TypeOptions::default()
        };
        assert_eq!(merge(existing, &options), expected);
    }

    #[test]
    fn types_without_preserve_drop_unmentioned_aliases_only() {
        let existing = "package c\n\ntype A int\n\ntype B string\n\ntype S struct{}\n";
        let options = TypeOptions {
            file_name: "c.go".into(),
            types: vec![TypeDef::new("A", "int")],
            preserve_existing: false,
            ..TypeOptions::default()
        };
        assert_eq!(
            merge(existing, &options),
            "package c\n\ntype A int\n\ntype S struct{}\n"
        );
    }
}
