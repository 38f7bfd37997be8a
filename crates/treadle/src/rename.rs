//! Syntactic renames, removals and file-header rewrites across a
//! [`SourceSet`].
//!
//! Renames are spelling-based: every identifier written as the old name is
//! rewritten, whatever it is bound to. Without type information a field or
//! method rename also touches unrelated selectors of the same spelling.
//! Each operation either applies to every file or to none.

use std::ops::Range;

use tracing::info;
use treadle_config::is_go_identifier;
use treadle_syntax::node::{children_by_field, descendants, is_identifier_kind, named_children};
use treadle_syntax::{Document, Node, TextEdit};

use crate::codegen;
use crate::edits;
use crate::error::{DeclKind, Error, Result};
use crate::model::{Declaration, FunctionDecl, base_type_name, package_clause};
use crate::source_set::SourceSet;
use crate::spec::Field;
use crate::structs;

const RENAME_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::rename");

/// String literal returned by stubs of removed string-returning callables.
pub const STUB_STRING: &str = "\"not implemented\"";

/// How a removal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Removal {
    /// The declaration was unreferenced and has been deleted.
    Deleted,
    /// The declaration is still called, so its body became a stub.
    Stubbed,
}

fn check_identifier(name: &str) -> Result<()> {
    if is_go_identifier(name) {
        Ok(())
    } else {
        Err(Error::validation(format!("`{name}` is not a valid Go identifier")))
    }
}

fn identifier_edits(doc: &Document, old: &str, new: &str) -> Vec<TextEdit> {
    descendants(doc.root_node())
        .into_iter()
        .filter(|node| is_identifier_kind(node.kind()) && doc.text(*node) == old)
        .map(|node| TextEdit::replace(node.byte_range(), new))
        .collect()
}

/// `x.old` selectors, which covers field access, method values and calls.
fn selector_edits(doc: &Document, old: &str, new: &str) -> Vec<TextEdit> {
    descendants(doc.root_node())
        .into_iter()
        .filter(|node| node.kind() == "selector_expression")
        .filter_map(|node| node.child_by_field_name("field"))
        .filter(|field| doc.text(*field) == old)
        .map(|field| TextEdit::replace(field.byte_range(), new))
        .collect()
}

/// Keys spelled `old` in composite literals of `struct_name`.
fn literal_key_edits(doc: &Document, struct_name: &str, old: &str, new: &str) -> Vec<TextEdit> {
    let mut found = Vec::new();
    for literal in descendants(doc.root_node()) {
        if literal.kind() != "composite_literal" {
            continue;
        }
        let Some(type_node) = literal.child_by_field_name("type") else {
            continue;
        };
        let base = base_type_name(doc.text(type_node));
        if base.rsplit('.').next() != Some(struct_name) {
            continue;
        }
        let Some(body) = literal.child_by_field_name("body") else {
            continue;
        };
        for element in named_children(body) {
            if element.kind() != "keyed_element" {
                continue;
            }
            if let Some(key) = element.named_child(0).and_then(key_identifier) {
                if doc.text(key) == old {
                    found.push(TextEdit::replace(key.byte_range(), new));
                }
            }
        }
    }
    found
}

/// The identifier a literal key consists of, if it is a bare name.
fn key_identifier(key: Node<'_>) -> Option<Node<'_>> {
    if is_identifier_kind(key.kind()) {
        return Some(key);
    }
    match named_children(key).as_slice() {
        [only] if is_identifier_kind(only.kind()) && only.byte_range() == key.byte_range() => {
            Some(*only)
        }
        _ => None,
    }
}

fn within(span: &Range<usize>, node: Node<'_>) -> bool {
    span.start <= node.start_byte() && node.end_byte() <= span.end
}

/// Sorts and drops repeated ranges.
fn dedup(mut file_edits: Vec<TextEdit>) -> Vec<TextEdit> {
    file_edits.sort_by_key(|edit| (edit.range().start, edit.range().end));
    file_edits.dedup_by(|a, b| a.range() == b.range());
    file_edits
}

impl SourceSet {
    /// Applies per-file edits on copies, then swaps every copy in.
    fn commit(&mut self, plan: Vec<Vec<TextEdit>>) -> Result<bool> {
        let mut staged = Vec::new();
        for (index, file_edits) in plan.into_iter().enumerate() {
            if file_edits.is_empty() {
                continue;
            }
            let Some(doc) = self.files().get(index) else {
                continue;
            };
            let mut copy = doc.reparsed()?;
            if edits::apply(&mut copy, &dedup(file_edits))? {
                staged.push((index, copy));
            }
        }
        let changed = !staged.is_empty();
        let files = self.files_mut();
        for (index, doc) in staged {
            if let Some(slot) = files.get_mut(index) {
                *slot = doc;
            }
        }
        Ok(changed)
    }

    fn plan(&self, per_file: impl Fn(&Document) -> Vec<TextEdit>) -> Vec<Vec<TextEdit>> {
        self.files().iter().map(per_file).collect()
    }

    /// Fails with [`Error::Duplicate`] if a package-level name is taken.
    fn ensure_free(&self, kind: DeclKind, name: &str) -> Result<()> {
        let taken = self
            .declarations()
            .iter()
            .any(|decl| !matches!(decl, Declaration::Method(_)) && decl.name() == name);
        if taken {
            return Err(Error::duplicate(kind, name));
        }
        Ok(())
    }

    fn rename_identifier(&mut self, kind: DeclKind, old: &str, new: &str) -> Result<()> {
        check_identifier(new)?;
        if old == new {
            return Ok(());
        }
        self.ensure_free(kind, new)?;
        let plan = self.plan(|doc| identifier_edits(doc, old, new));
        self.commit(plan)?;
        info!(target: RENAME_TARGET, kind = %kind, old, new, "renamed");
        Ok(())
    }

    /// Renames struct `old` and every identifier spelled `old`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the struct does not exist,
    /// [`Error::Validation`] for an invalid new name and
    /// [`Error::Duplicate`] when `new` is already declared.
    pub fn rename_struct(&mut self, old: &str, new: &str) -> Result<()> {
        self.require_struct(old)?;
        self.rename_identifier(DeclKind::Struct, old, new)
    }

    /// Renames function `old` and every identifier spelled `old`.
    ///
    /// # Errors
    ///
    /// As [`rename_struct`](Self::rename_struct), for functions.
    pub fn rename_function(&mut self, old: &str, new: &str) -> Result<()> {
        self.require_function(old)?;
        self.rename_identifier(DeclKind::Function, old, new)
    }

    /// Renames variable `old` and every identifier spelled `old`.
    ///
    /// # Errors
    ///
    /// As [`rename_struct`](Self::rename_struct), for variables.
    pub fn rename_variable(&mut self, old: &str, new: &str) -> Result<()> {
        self.require_variable(old)?;
        self.rename_identifier(DeclKind::Variable, old, new)
    }

    /// Renames constant `old` and every identifier spelled `old`.
    ///
    /// # Errors
    ///
    /// As [`rename_struct`](Self::rename_struct), for constants.
    pub fn rename_constant(&mut self, old: &str, new: &str) -> Result<()> {
        self.require_constant(old)?;
        self.rename_identifier(DeclKind::Constant, old, new)
    }

    /// Renames type `old`, struct or not, and every identifier spelled `old`.
    ///
    /// # Errors
    ///
    /// As [`rename_struct`](Self::rename_struct), for types.
    pub fn rename_type(&mut self, old: &str, new: &str) -> Result<()> {
        if self.find_type(old).is_none() && self.find_struct(old).is_none() {
            return Err(Error::not_found(DeclKind::Type, old));
        }
        self.rename_identifier(DeclKind::Type, old, new)
    }

    /// Renames field `old` of `struct_name` to `field.name`, then applies
    /// `field.type_expr` and `field.annotation` when they are non-empty.
    ///
    /// The field declaration, keys of `struct_name{...}` literals and every
    /// selector spelled `old` are rewritten. An empty `field.name` keeps the
    /// old name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for a missing struct or field,
    /// [`Error::Duplicate`] when the new name is taken within the struct and
    /// [`Error::Validation`] for invalid names or embedded fields.
    pub fn rename_struct_field(&mut self, struct_name: &str, old: &str, field: &Field) -> Result<()> {
        let decl = self.require_struct(struct_name)?;
        let current = decl
            .field(old)
            .ok_or_else(|| Error::not_found(DeclKind::Field, format!("{struct_name}.{old}")))?;
        let target = match field.name.trim() {
            "" => old,
            name => name,
        };
        check_identifier(target)?;
        if target != old && decl.field(target).is_some() {
            return Err(Error::duplicate(DeclKind::Field, format!("{struct_name}.{target}")));
        }
        let Some(name_span) = current.name_span.clone() else {
            return Err(Error::validation(format!(
                "embedded field `{old}` cannot be renamed"
            )));
        };

        self.transact(|set| {
            if target != old {
                let plan = set.plan(|doc| {
                    let mut found = selector_edits(doc, old, target);
                    found.extend(literal_key_edits(doc, struct_name, old, target));
                    if doc.path() == decl.path {
                        found.push(TextEdit::replace(name_span.clone(), target));
                    }
                    found
                });
                set.commit(plan)?;
            }
            let type_expr = field.type_expr.trim();
            let tag = field.tag_literal();
            if type_expr.is_empty() && tag.is_none() {
                return Ok(());
            }
            set.edit_struct_items(struct_name, |items| {
                if !type_expr.is_empty() {
                    structs::upsert_field(items, target, type_expr, None);
                }
                if let Some(literal) = tag {
                    structs::update_tag(items, target, |_| Some(literal));
                }
                Ok(())
            })
        })?;
        info!(
            target: RENAME_TARGET,
            name = struct_name,
            old,
            new = target,
            "renamed field"
        );
        Ok(())
    }

    /// Renames method `old` on `receiver` and every selector spelled `old`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the method does not exist and
    /// [`Error::Duplicate`] when the receiver already has `new`.
    pub fn rename_method(&mut self, receiver: &str, old: &str, new: &str) -> Result<()> {
        let decl = self.require_method(receiver, old)?;
        check_identifier(new)?;
        if old == new {
            return Ok(());
        }
        if self.find_method(receiver, new).is_some() {
            return Err(Error::duplicate(
                DeclKind::Method,
                format!("{}.{new}", base_type_name(receiver)),
            ));
        }
        let name_span = self.name_span(&decl, "method_declaration")?;
        let plan = self.plan(|doc| {
            let mut found = selector_edits(doc, old, new);
            if doc.path() == decl.path {
                found.push(TextEdit::replace(name_span.clone(), new));
            }
            found
        });
        self.commit(plan)?;
        info!(
            target: RENAME_TARGET,
            receiver = base_type_name(receiver),
            old,
            new,
            "renamed method"
        );
        Ok(())
    }

    pub(crate) fn name_span(&self, decl: &FunctionDecl, kind: &str) -> Result<Range<usize>> {
        let doc = self.require_file(&decl.path)?;
        edits::node_at(doc, &decl.span, kind)
            .and_then(|node| node.child_by_field_name("name"))
            .map(|node| node.byte_range())
            .ok_or_else(|| Error::not_found(DeclKind::Function, decl.name.clone()))
    }

    /// Removes method `name` from `receiver`.
    ///
    /// A method still called through a selector elsewhere keeps its
    /// signature and gets a stub body returning zero values instead.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the method does not exist.
    pub fn remove_method(&mut self, receiver: &str, name: &str) -> Result<Removal> {
        let decl = self.require_method(receiver, name)?;
        let called = self.any_node(&decl, |doc, node| {
            node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .filter(|callee| callee.kind() == "selector_expression")
                    .and_then(|callee| callee.child_by_field_name("field"))
                    .is_some_and(|field| doc.text(field) == name)
        });
        self.remove_callable(&decl, "method_declaration", called)
    }

    /// Removes function `name`, stubbing it when it is still called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist.
    pub fn remove_function(&mut self, name: &str) -> Result<Removal> {
        let decl = self.require_function(name)?;
        let called = self.any_node(&decl, |doc, node| {
            node.kind() == "call_expression"
                && node
                    .child_by_field_name("function")
                    .is_some_and(|callee| callee.kind() == "identifier" && doc.text(callee) == name)
        });
        self.remove_callable(&decl, "function_declaration", called)
    }

    /// Whether any node outside `decl` satisfies `test`.
    fn any_node(&self, decl: &FunctionDecl, test: impl Fn(&Document, Node<'_>) -> bool) -> bool {
        self.files().iter().any(|doc| {
            descendants(doc.root_node()).into_iter().any(|node| {
                !(doc.path() == decl.path && within(&decl.span, node)) && test(doc, node)
            })
        })
    }

    fn remove_callable(&mut self, decl: &FunctionDecl, kind: &str, called: bool) -> Result<Removal> {
        let doc = self.file_mut(&decl.path)?;
        let (edit, removal) = if called {
            let node = edits::node_at(doc, &decl.span, kind)
                .ok_or_else(|| Error::not_found(DeclKind::Function, decl.name.clone()))?;
            let stub = codegen::block(&stub_body(doc, node));
            let edit = match &decl.body_span {
                Some(span) => TextEdit::replace(span.clone(), stub),
                None => TextEdit::insert_at(decl.span.end, format!(" {stub}")),
            };
            (edit, Removal::Stubbed)
        } else {
            (edits::remove_top_level(doc, &decl.span), Removal::Deleted)
        };
        edits::apply(doc, &[edit])?;
        info!(
            target: RENAME_TARGET,
            file = %decl.path.display(),
            name = %decl.name,
            outcome = ?removal,
            "removed callable"
        );
        Ok(removal)
    }

    /// Appends a copy of function `name` called `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the function does not exist and
    /// [`Error::Duplicate`] when `new` is already declared.
    pub fn duplicate_function(&mut self, name: &str, new: &str) -> Result<()> {
        let decl = self.require_function(name)?;
        check_identifier(new)?;
        self.ensure_free(DeclKind::Function, new)?;
        self.append_copy(&decl, "function_declaration", new)
    }

    /// Appends a copy of method `name` on `receiver` called `new`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the method does not exist and
    /// [`Error::Duplicate`] when the receiver already has `new`.
    pub fn duplicate_method(&mut self, receiver: &str, name: &str, new: &str) -> Result<()> {
        let decl = self.require_method(receiver, name)?;
        check_identifier(new)?;
        if self.find_method(receiver, new).is_some() {
            return Err(Error::duplicate(
                DeclKind::Method,
                format!("{}.{new}", base_type_name(receiver)),
            ));
        }
        self.append_copy(&decl, "method_declaration", new)
    }

    fn append_copy(&mut self, decl: &FunctionDecl, kind: &str, new: &str) -> Result<()> {
        let name_span = self.name_span(decl, kind)?;
        let doc = self.file_mut(&decl.path)?;
        let source = doc.source();
        let copy = format!(
            "{}{new}{}",
            source.get(decl.span.start..name_span.start).unwrap_or_default(),
            source.get(name_span.end..decl.span.end).unwrap_or_default()
        );
        let updated = codegen::append_declaration(source, &copy);
        doc.replace_source(updated)?;
        Ok(())
    }

    /// Rewrites the package clause of every file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `name` is not an identifier.
    pub fn set_package_name(&mut self, name: &str) -> Result<()> {
        check_identifier(name)?;
        let plan = self.plan(|doc| {
            package_clause(doc)
                .filter(|(current, _)| current != name)
                .map(|(_, span)| vec![TextEdit::replace(span, name)])
                .unwrap_or_default()
        });
        self.commit(plan)?;
        Ok(())
    }

    /// Returns the `//go:build` expression of the first file carrying one.
    #[must_use]
    pub fn build_constraint(&self) -> Option<String> {
        self.files().iter().find_map(|doc| {
            constraint_comments(doc)
                .into_iter()
                .find_map(|node| constraint_expression(doc.text(node)))
                .map(str::to_owned)
        })
    }

    /// Sets the build constraint of every file to the conjunction of `tags`.
    ///
    /// An empty `tags` removes the constraint. Legacy `// +build` lines are
    /// dropped either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when a tag is not a build tag.
    pub fn set_build_tags<S: AsRef<str>>(&mut self, tags: &[S]) -> Result<()> {
        for tag in tags {
            check_build_tag(tag.as_ref())?;
        }
        let expression = tags.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" && ");
        let plan = self.plan(|doc| build_tag_edits(doc, &expression));
        if self.commit(plan)? {
            info!(target: RENAME_TARGET, constraint = %expression, "set build tags");
        }
        Ok(())
    }
}

fn check_build_tag(tag: &str) -> Result<()> {
    let term = tag.strip_prefix('!').unwrap_or(tag);
    let valid = !term.is_empty()
        && term
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("`{tag}` is not a valid build tag")))
    }
}

/// Comments ahead of the package clause that hold a build constraint.
fn constraint_comments(doc: &Document) -> Vec<Node<'_>> {
    named_children(doc.root_node())
        .into_iter()
        .take_while(|node| node.kind() != "package_clause")
        .filter(|node| {
            let text = doc.text(*node);
            node.kind() == "comment"
                && (text.starts_with("//go:build") || text.starts_with("// +build"))
        })
        .collect()
}

fn constraint_expression(text: &str) -> Option<&str> {
    text.strip_prefix("//go:build").map(str::trim)
}

/// Extends `span` over the whitespace that follows it.
fn through_blank_lines(source: &str, span: Range<usize>) -> Range<usize> {
    let rest = source.get(span.end..).unwrap_or_default();
    let skipped = rest.len().saturating_sub(rest.trim_start().len());
    span.start..span.end.saturating_add(skipped)
}

fn build_tag_edits(doc: &Document, expression: &str) -> Vec<TextEdit> {
    let comments = constraint_comments(doc);
    let removal =
        |node: &Node<'_>| TextEdit::delete(through_blank_lines(doc.source(), node.byte_range()));
    if expression.is_empty() {
        return comments.iter().map(removal).collect();
    }
    let line = format!("//go:build {expression}");
    match comments.split_first() {
        None => vec![TextEdit::insert_at(0, format!("{line}\n\n"))],
        Some((first, [])) if doc.text(*first) == line => Vec::new(),
        Some((first, rest)) => {
            let span = through_blank_lines(doc.source(), first.byte_range());
            let mut edits = vec![TextEdit::replace(span, format!("{line}\n\n"))];
            edits.extend(rest.iter().map(removal));
            edits
        }
    }
}

/// Builds `return ...` with one zero value per result.
fn stub_body(doc: &Document, decl: Node<'_>) -> String {
    let Some(result) = decl.child_by_field_name("result") else {
        return String::new();
    };
    let mut values = Vec::new();
    if result.kind() == "parameter_list" {
        for param in named_children(result) {
            let Some(type_node) = param.child_by_field_name("type") else {
                continue;
            };
            let count = children_by_field(param, "name").len().max(1);
            let value = zero_value(doc.text(type_node));
            values.extend(std::iter::repeat_n(value, count));
        }
    } else {
        values.push(zero_value(doc.text(result)));
    }
    if values.is_empty() {
        String::new()
    } else {
        format!("return {}", values.join(", "))
    }
}

fn zero_value(type_expr: &str) -> &'static str {
    match type_expr.trim() {
        "string" => STUB_STRING,
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "byte" | "rune" => "0",
        "float32" | "float64" => "0.0",
        "bool" => "false",
        _ => "nil",
    }
}
