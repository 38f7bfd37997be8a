//! Struct body reconciliation shared by the merge engine and the live
//! struct editor.
//!
//! A body is read into [`BodyItem`]s, edited as a list and written back with
//! gofmt alignment. Comments and field text the edit does not touch are
//! carried through unchanged.

use treadle_syntax::node::{children_by_field, named_children};
use treadle_syntax::{Document, Node, TextEdit};

use crate::codegen::{self, BodyItem, FieldLine};
use crate::edits;
use crate::error::{DeclKind, Error, Result};
use crate::model::{StructDecl, base_type_name};
use crate::spec::Field;

/// Reads the items of a `field_declaration_list` node.
pub(crate) fn body_items(doc: &Document, list: Node<'_>) -> Vec<BodyItem> {
    let source = doc.source();
    let mut items: Vec<BodyItem> = Vec::new();
    let mut last_end = list.start_byte().saturating_add(1);
    for child in named_children(list) {
        let gap = source.get(last_end..child.start_byte()).unwrap_or_default();
        let newlines = gap.matches('\n').count();
        last_end = child.end_byte();
        match child.kind() {
            "comment" => {
                let text = doc.text(child).to_owned();
                if newlines == 0 {
                    if let Some(BodyItem::Field(line)) = items.last_mut() {
                        if line.comment.is_none() {
                            line.comment = Some(text);
                            continue;
                        }
                    }
                }
                push_with_gap(&mut items, newlines, BodyItem::Comment(text));
            }
            "field_declaration" => {
                if let Some(line) = field_line(doc, child) {
                    push_with_gap(&mut items, newlines, BodyItem::Field(line));
                }
            }
            _ => {}
        }
    }
    items
}

fn push_with_gap(items: &mut Vec<BodyItem>, newlines: usize, item: BodyItem) {
    if newlines >= 2 && !items.is_empty() {
        items.push(BodyItem::Blank);
    }
    items.push(item);
}

fn field_line(doc: &Document, decl: Node<'_>) -> Option<FieldLine> {
    let type_node = decl.child_by_field_name("type")?;
    let names: Vec<String> = children_by_field(decl, "name")
        .into_iter()
        .map(|name| doc.text(name).to_owned())
        .collect();
    let type_expr = if names.is_empty() {
        doc.source()
            .get(decl.start_byte()..type_node.end_byte())
            .unwrap_or_default()
            .to_owned()
    } else {
        doc.text(type_node).to_owned()
    };
    Some(FieldLine {
        names,
        type_expr,
        tag: decl
            .child_by_field_name("tag")
            .map(|tag| doc.text(tag).to_owned()),
        comment: None,
    })
}

/// Reads the current items of `decl`.
pub(crate) fn current_items(doc: &Document, decl: &StructDecl) -> Result<Vec<BodyItem>> {
    if decl.body_span == decl.type_span {
        return Ok(Vec::new());
    }
    let list = edits::node_at(doc, &decl.body_span, "field_declaration_list")
        .ok_or_else(|| Error::not_found(DeclKind::Struct, decl.name.clone()))?;
    Ok(body_items(doc, list))
}

/// Parses a raw field list into body items.
pub(crate) fn raw_items(content: &str) -> Result<Vec<BodyItem>> {
    let scratch = format!("package tmp\n\ntype _ struct {{\n{}\n}}\n", content.trim_matches('\n'));
    let doc = Document::parse("content", scratch)?;
    let list = treadle_syntax::node::descendant_of_kind(doc.root_node(), "field_declaration_list")
        .ok_or_else(|| Error::validation("content does not describe struct fields"))?;
    Ok(body_items(&doc, list))
}

/// Names a line declares; embedded fields are named after their type.
fn line_names(line: &FieldLine) -> Vec<&str> {
    if line.names.is_empty() {
        let base = base_type_name(&line.type_expr);
        vec![base.rsplit('.').next().unwrap_or(base)]
    } else {
        line.names.iter().map(String::as_str).collect()
    }
}

fn position_of(items: &[BodyItem], name: &str) -> Option<usize> {
    items.iter().position(|item| match item {
        BodyItem::Field(line) => line_names(line).contains(&name),
        _ => false,
    })
}

/// Returns whether a field named `name` exists.
pub(crate) fn has_field(items: &[BodyItem], name: &str) -> bool {
    position_of(items, name).is_some()
}

/// Sets the type and, when given, the tag of `name`, appending the field
/// when absent.
pub(crate) fn upsert_field(items: &mut Vec<BodyItem>, name: &str, type_expr: &str, tag: Option<String>) {
    let wanted = type_expr.trim();
    let Some(index) = position_of(items, name) else {
        items.push(BodyItem::Field(FieldLine::new(name, wanted, tag)));
        return;
    };
    let Some(BodyItem::Field(line)) = items.get_mut(index) else {
        return;
    };
    if line.names.len() <= 1 {
        let embedded_same_type = line.names.is_empty() && line.type_expr == wanted;
        if line.names.is_empty() && !embedded_same_type {
            line.names = vec![name.to_owned()];
        }
        line.type_expr = wanted.to_owned();
        if tag.is_some() {
            line.tag = tag;
        }
        return;
    }
    let unchanged = line.type_expr == wanted && (tag.is_none() || tag == line.tag);
    if unchanged {
        return;
    }
    line.names.retain(|existing| existing != name);
    let inherited = tag.or_else(|| line.tag.clone());
    items.insert(
        index.saturating_add(1),
        BodyItem::Field(FieldLine::new(name, wanted, inherited)),
    );
}

/// Removes `name`, returning whether it existed.
pub(crate) fn remove_field(items: &mut Vec<BodyItem>, name: &str) -> bool {
    let Some(index) = position_of(items, name) else {
        return false;
    };
    let drop_line = match items.get_mut(index) {
        Some(BodyItem::Field(line)) if line.names.len() > 1 => {
            line.names.retain(|existing| existing != name);
            false
        }
        _ => true,
    };
    if drop_line {
        items.remove(index);
    }
    tidy(items);
    true
}

/// Edits the tag of `name` in place.
pub(crate) fn update_tag(
    items: &mut [BodyItem],
    name: &str,
    update: impl FnOnce(Option<&str>) -> Option<String>,
) -> bool {
    let Some(index) = position_of(items, name) else {
        return false;
    };
    if let Some(BodyItem::Field(line)) = items.get_mut(index) {
        line.tag = update(line.tag.as_deref());
    }
    true
}

/// Applies an ensure/delete/preserve request.
pub(crate) fn apply_fields(
    items: &mut Vec<BodyItem>,
    ensure: &[Field],
    delete: &[String],
    preserve_existing: bool,
) {
    if !preserve_existing && delete.is_empty() {
        items.clear();
    }
    for field in ensure {
        upsert_field(items, field.name.trim(), &field.type_expr, field.tag_literal());
    }
    for name in delete {
        remove_field(items, name.trim());
    }
    tidy(items);
}

/// Merges raw items into `items`, keeping fields that are not mentioned.
pub(crate) fn merge_raw(items: &mut Vec<BodyItem>, raw: Vec<BodyItem>) {
    for item in raw {
        let BodyItem::Field(line) = item else {
            continue;
        };
        let names: Vec<String> = line_names(&line).into_iter().map(str::to_owned).collect();
        if names.iter().all(|name| !has_field(items, name)) {
            items.push(BodyItem::Field(line));
            continue;
        }
        for name in names {
            upsert_field(items, &name, &line.type_expr, line.tag.clone());
        }
    }
    tidy(items);
}

/// Drops leading, trailing and repeated blank items.
fn tidy(items: &mut Vec<BodyItem>) {
    let mut previous_blank = true;
    items.retain(|item| {
        let blank = matches!(item, BodyItem::Blank);
        let keep = !(blank && previous_blank);
        previous_blank = blank;
        keep
    });
    while matches!(items.last(), Some(BodyItem::Blank)) {
        items.pop();
    }
}

/// Rewrites the body of `decl` with `items`.
pub(crate) fn rewrite(doc: &mut Document, decl: &StructDecl, items: &[BodyItem]) -> Result<bool> {
    let rendered = codegen::struct_type(items);
    let edit = TextEdit::replace(decl.type_span.clone(), rendered);
    Ok(edits::apply(doc, &[edit])?)
}
