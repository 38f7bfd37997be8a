//! Small traversal helpers over Tree-sitter nodes.

use std::ops::Range;

use tree_sitter::Node;

/// Node kinds that carry a plain identifier spelling.
pub const IDENTIFIER_KINDS: [&str; 3] = ["identifier", "type_identifier", "field_identifier"];

/// Returns whether `kind` is one of [`IDENTIFIER_KINDS`].
#[must_use]
pub fn is_identifier_kind(kind: &str) -> bool {
    IDENTIFIER_KINDS.contains(&kind)
}

/// Returns the text covered by `node` in `source`.
#[must_use]
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Collects `node` and all of its descendants in document order.
#[must_use]
pub fn descendants<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut nodes = Vec::new();
    let mut cursor = node.walk();
    loop {
        nodes.push(cursor.node());
        if cursor.goto_first_child() || cursor.goto_next_sibling() {
            continue;
        }
        loop {
            if !cursor.goto_parent() || cursor.node() == node {
                return nodes;
            }
            if cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

/// Collects the named children of `node`.
#[must_use]
pub fn named_children<'tree>(node: Node<'tree>) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Collects every child stored under `field`.
#[must_use]
pub fn children_by_field<'tree>(node: Node<'tree>, field: &str) -> Vec<Node<'tree>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor).collect()
}

/// Finds the first named child of the given kind.
#[must_use]
pub fn child_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind() == kind)
}

/// Finds the first descendant of the given kind, excluding `node` itself.
#[must_use]
pub fn descendant_of_kind<'tree>(node: Node<'tree>, kind: &str) -> Option<Node<'tree>> {
    descendants(node)
        .into_iter()
        .skip(1)
        .find(|child| child.kind() == kind)
}

/// Byte ranges of every raw (backtick) string literal under `node`.
///
/// Text inside these ranges is kept byte for byte by any re-indentation.
#[must_use]
pub fn raw_string_ranges(node: Node<'_>) -> Vec<Range<usize>> {
    descendants(node)
        .into_iter()
        .filter(|child| child.kind() == "raw_string_literal")
        .map(|child| child.byte_range())
        .collect()
}
