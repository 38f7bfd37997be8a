//! Reads declaration snapshots out of a parsed document.

use std::ops::Range;

use treadle_syntax::node::{child_of_kind, children_by_field, named_children, raw_string_ranges};
use treadle_syntax::{Document, Node};

use crate::indent;

use super::{
    Declaration, FieldDecl, FunctionDecl, Parameter, Receiver, SpecSite, StructDecl, TypeDecl,
    ValueDecl, ValueKind, base_type_name,
};

/// Collects every top-level declaration of `doc` in source order.
pub(crate) fn declarations(doc: &Document) -> Vec<Declaration> {
    let mut found = Vec::new();
    for node in named_children(doc.root_node()) {
        match node.kind() {
            "function_declaration" => found.push(Declaration::Function(scan_function(doc, node))),
            "method_declaration" => found.push(Declaration::Method(scan_function(doc, node))),
            "type_declaration" => scan_type_declaration(doc, node, &mut found),
            "var_declaration" => scan_value_declaration(doc, node, ValueKind::Var, &mut found),
            "const_declaration" => scan_value_declaration(doc, node, ValueKind::Const, &mut found),
            _ => {}
        }
    }
    found
}

/// Returns the package name and the span of its identifier.
pub(crate) fn package_clause(doc: &Document) -> Option<(String, Range<usize>)> {
    let clause = child_of_kind(doc.root_node(), "package_clause")?;
    let ident = child_of_kind(clause, "package_identifier")
        .or_else(|| child_of_kind(clause, "identifier"))?;
    Some((doc.text(ident).to_owned(), ident.byte_range()))
}

/// Strips the braces of a block and the indentation shared by its lines.
///
/// Raw string literals inside the block keep their text unchanged.
fn block_body(doc: &Document, block: Node<'_>) -> String {
    let span = block.byte_range();
    let text = doc.text(block);
    let start = if text.starts_with('{') {
        span.start.saturating_add(1)
    } else {
        span.start
    };
    let end = if text.len() > 1 && text.ends_with('}') {
        span.end.saturating_sub(1)
    } else {
        span.end
    };
    let inner = doc.source().get(start..end).unwrap_or_default();
    let raw: Vec<Range<usize>> = raw_string_ranges(block)
        .into_iter()
        .map(|range| range.start.saturating_sub(start)..range.end.saturating_sub(start))
        .collect();
    indent::dedent(inner, &raw)
}

fn optional_text(doc: &Document, node: Option<Node<'_>>) -> Option<String> {
    node.map(|n| doc.text(n).to_owned())
}

fn scan_function(doc: &Document, node: Node<'_>) -> FunctionDecl {
    let name = node
        .child_by_field_name("name")
        .map(|n| doc.text(n).to_owned())
        .unwrap_or_default();
    let receiver = node
        .child_by_field_name("receiver")
        .and_then(|list| scan_parameters(doc, list).into_iter().next())
        .map(|param| Receiver {
            name: (!param.name.is_empty()).then_some(param.name),
            type_expr: param.type_expr,
        });
    let parameters = node
        .child_by_field_name("parameters")
        .map(|list| scan_parameters(doc, list))
        .unwrap_or_default();
    let body_node = node.child_by_field_name("body");

    FunctionDecl {
        path: doc.path().to_path_buf(),
        name,
        receiver,
        type_parameters: optional_text(doc, node.child_by_field_name("type_parameters")),
        parameters,
        result: optional_text(doc, node.child_by_field_name("result")),
        body: body_node.map(|body| block_body(doc, body)),
        span: node.byte_range(),
        body_span: body_node.map(|body| body.byte_range()),
    }
}

fn scan_parameters(doc: &Document, list: Node<'_>) -> Vec<Parameter> {
    let mut parameters = Vec::new();
    for decl in named_children(list) {
        if !decl.kind().ends_with("parameter_declaration") {
            continue;
        }
        let names = children_by_field(decl, "name");
        let type_text = match names.last() {
            Some(last) => doc
                .source()
                .get(last.end_byte()..decl.end_byte())
                .unwrap_or_default()
                .trim()
                .to_owned(),
            None => doc.text(decl).trim().to_owned(),
        };
        if names.is_empty() {
            parameters.push(Parameter::new("", type_text));
        } else {
            for name in names {
                parameters.push(Parameter::new(doc.text(name), type_text.clone()));
            }
        }
    }
    parameters
}

fn scan_type_declaration(doc: &Document, decl: Node<'_>, found: &mut Vec<Declaration>) {
    let (specs, grouped) = specifications(decl, &["type_spec", "type_alias"]);
    let siblings = specs.len();
    for spec in specs {
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let Some(type_node) = spec.child_by_field_name("type") else {
            continue;
        };
        let name = doc.text(name_node).to_owned();
        let type_parameters = optional_text(doc, spec.child_by_field_name("type_parameters"));
        if spec.kind() == "type_spec" && type_node.kind() == "struct_type" {
            found.push(Declaration::Struct(StructDecl {
                path: doc.path().to_path_buf(),
                name,
                type_parameters,
                fields: child_of_kind(type_node, "field_declaration_list")
                    .map(|list| scan_fields(doc, list))
                    .unwrap_or_default(),
                spec_span: spec.byte_range(),
                type_span: type_node.byte_range(),
                body_span: child_of_kind(type_node, "field_declaration_list")
                    .map_or_else(|| type_node.byte_range(), |list| list.byte_range()),
            }));
            continue;
        }
        found.push(Declaration::TypeAlias(TypeDecl {
            path: doc.path().to_path_buf(),
            name: name.clone(),
            type_parameters,
            definition: doc.text(type_node).to_owned(),
            alias: spec.kind() == "type_alias",
            spec: SpecSite {
                span: spec.byte_range(),
                decl_span: decl.byte_range(),
                grouped,
                siblings,
                names: vec![name],
                values: Vec::new(),
            },
        }));
    }
}

fn scan_fields(doc: &Document, list: Node<'_>) -> Vec<FieldDecl> {
    let mut fields = Vec::new();
    for decl in named_children(list) {
        if decl.kind() != "field_declaration" {
            continue;
        }
        let tag = optional_text(doc, decl.child_by_field_name("tag"));
        let names = children_by_field(decl, "name");
        let Some(type_node) = decl.child_by_field_name("type") else {
            continue;
        };
        if names.is_empty() {
            let type_expr = doc
                .source()
                .get(decl.start_byte()..type_node.end_byte())
                .unwrap_or_default()
                .to_owned();
            let name = embedded_field_name(&type_expr).to_owned();
            fields.push(FieldDecl {
                name,
                type_expr,
                tag,
                embedded: true,
                name_span: None,
            });
            continue;
        }
        let type_expr = doc.text(type_node).to_owned();
        for name in names {
            fields.push(FieldDecl {
                name: doc.text(name).to_owned(),
                type_expr: type_expr.clone(),
                tag: tag.clone(),
                embedded: false,
                name_span: Some(name.byte_range()),
            });
        }
    }
    fields
}

fn embedded_field_name(type_expr: &str) -> &str {
    let base = base_type_name(type_expr);
    base.rsplit('.').next().unwrap_or(base)
}

fn scan_value_declaration(
    doc: &Document,
    decl: Node<'_>,
    kind: ValueKind,
    found: &mut Vec<Declaration>,
) {
    let spec_kind = match kind {
        ValueKind::Var => "var_spec",
        ValueKind::Const => "const_spec",
    };
    let (specs, grouped) = specifications(decl, &[spec_kind]);
    let siblings = specs.len();
    for spec in specs {
        let names: Vec<String> = children_by_field(spec, "name")
            .into_iter()
            .map(|n| doc.text(n).to_owned())
            .collect();
        let values: Vec<String> = spec
            .child_by_field_name("value")
            .map(|list| {
                let items = named_children(list);
                if list.kind() == "expression_list" {
                    items.into_iter().map(|n| doc.text(n).to_owned()).collect()
                } else {
                    vec![doc.text(list).to_owned()]
                }
            })
            .unwrap_or_default();
        let type_expr = optional_text(doc, spec.child_by_field_name("type"));
        let site = SpecSite {
            span: spec.byte_range(),
            decl_span: decl.byte_range(),
            grouped,
            siblings,
            names: names.clone(),
            values: values.clone(),
        };
        for (index, name) in names.iter().enumerate() {
            let value_decl = ValueDecl {
                path: doc.path().to_path_buf(),
                name: name.clone(),
                kind,
                type_expr: type_expr.clone(),
                value: values.get(index).cloned(),
                spec: site.clone(),
            };
            found.push(match kind {
                ValueKind::Var => Declaration::Variable(value_decl),
                ValueKind::Const => Declaration::Constant(value_decl),
            });
        }
    }
}

/// Returns the specifications of a `var`/`const`/`type` declaration and
/// whether they sit inside parentheses.
fn specifications<'tree>(decl: Node<'tree>, kinds: &[&str]) -> (Vec<Node<'tree>>, bool) {
    let mut specs = Vec::new();
    let mut grouped = has_open_paren(decl);
    for child in named_children(decl) {
        if kinds.contains(&child.kind()) {
            specs.push(child);
        } else if child.kind().ends_with("_list") {
            grouped = grouped || has_open_paren(child);
            specs.extend(
                named_children(child)
                    .into_iter()
                    .filter(|spec| kinds.contains(&spec.kind())),
            );
        }
    }
    (specs, grouped)
}

fn has_open_paren(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == "(");
    found
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use treadle_syntax::Document;

    use super::*;

    const SOURCE: &str = r#"package models

import "time"

// User is a person.
type User struct {
	ID, Key string `json:"id"`
	Name    string
	*Audit
	time.Time
}

type (
	ID    string
	Alias = int
)

var (
	a, b = 1, 2
	c    int
)

const Limit = 10

func New(name string, tags ...string) (*User, error) {
	return &User{Name: name}, nil
}

func (u *User) Greet() string {
	return "hi " + u.Name
}
"#;

    fn parse() -> Document {
        Document::parse("user.go", SOURCE).expect("parse")
    }

    #[test]
    fn collects_every_declaration_kind() {
        let doc = parse();
        let kinds: Vec<(String, String)> = declarations(&doc)
            .iter()
            .map(|decl| (decl.kind().to_string(), decl.name().to_owned()))
            .collect();
        let expected: Vec<(String, String)> = [
            ("struct", "User"),
            ("type", "ID"),
            ("type", "Alias"),
            ("variable", "a"),
            ("variable", "b"),
            ("variable", "c"),
            ("constant", "Limit"),
            ("function", "New"),
            ("method", "Greet"),
        ]
        .iter()
        .map(|(k, n)| ((*k).to_owned(), (*n).to_owned()))
        .collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn struct_fields_expand_grouped_names_and_embedding() {
        let doc = parse();
        let Some(Declaration::Struct(user)) = declarations(&doc).into_iter().next() else {
            panic!("expected struct first");
        };
        assert_eq!(user.field_names(), vec!["ID", "Key", "Name", "Audit", "Time"]);
        let id = user.field("ID").expect("ID");
        assert_eq!(id.type_expr, "string");
        assert_eq!(id.tag.as_deref(), Some("`json:\"id\"`"));
        let audit = user.field("Audit").expect("Audit");
        assert!(audit.embedded);
        assert_eq!(audit.type_expr, "*Audit");
    }

    #[test]
    fn functions_capture_signature_and_body() {
        let doc = parse();
        let function = declarations(&doc)
            .into_iter()
            .find_map(|decl| match decl {
                Declaration::Function(f) => Some(f),
                _ => None,
            })
            .expect("function");
        assert_eq!(
            function.parameters,
            vec![Parameter::new("name", "string"), Parameter::new("tags", "...string")]
        );
        assert_eq!(function.result.as_deref(), Some("(*User, error)"));
        assert_eq!(function.body.as_deref(), Some("return &User{Name: name}, nil"));
    }

    #[test]
    fn methods_capture_receiver() {
        let doc = parse();
        let method = declarations(&doc)
            .into_iter()
            .find_map(|decl| match decl {
                Declaration::Method(m) => Some(m),
                _ => None,
            })
            .expect("method");
        let receiver = method.receiver.expect("receiver");
        assert_eq!(receiver.name.as_deref(), Some("u"));
        assert_eq!(receiver.type_expr, "*User");
        assert_eq!(receiver.base_type(), "User");
    }

    #[test]
    fn values_pair_names_with_expressions() {
        let doc = parse();
        let values: Vec<ValueDecl> = declarations(&doc)
            .into_iter()
            .filter_map(|decl| match decl {
                Declaration::Variable(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values.first().and_then(|v| v.value.as_deref()), Some("1"));
        assert_eq!(values.get(1).and_then(|v| v.value.as_deref()), Some("2"));
        let c = values.get(2).expect("c");
        assert_eq!(c.type_expr.as_deref(), Some("int"));
        assert!(c.spec.grouped);
        assert_eq!(c.spec.siblings, 2);
    }

    #[test]
    fn type_specs_distinguish_aliases() {
        let doc = parse();
        let types: Vec<TypeDecl> = declarations(&doc)
            .into_iter()
            .filter_map(|decl| match decl {
                Declaration::TypeAlias(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(types.len(), 2);
        assert!(!types.first().expect("ID").alias);
        assert!(types.get(1).expect("Alias").alias);
        assert_eq!(types.get(1).expect("Alias").definition, "int");
    }

    #[test]
    fn package_clause_reports_name() {
        let doc = parse();
        let (name, span) = package_clause(&doc).expect("package");
        assert_eq!(name, "models");
        assert_eq!(SOURCE.get(span), Some("models"));
    }

    #[rstest]
    #[case("{\n\treturn 1\n}", "return 1")]
    #[case("{ return 1 }", "return 1")]
    #[case("{\n\tif x {\n\t\ty()\n\t}\n\n\tz()\n}", "if x {\n\ty()\n}\n\nz()")]
    #[case("{}", "")]
    #[case(
        "{\n\tq := `SELECT *\nFROM users\n  WHERE id = 1`\n\treturn q\n}",
        "q := `SELECT *\nFROM users\n  WHERE id = 1`\nreturn q"
    )]
    fn block_bodies_are_dedented(#[case] block: &str, #[case] expected: &str) {
        let source = format!("package p\n\nfunc f() {block}\n");
        let doc = Document::parse("f.go", &source).expect("parse");
        let found = declarations(&doc);
        let Some(Declaration::Function(function)) = found.first() else {
            panic!("expected a function, found {found:?}");
        };
        assert_eq!(function.body.as_deref(), Some(expected));
    }
}
