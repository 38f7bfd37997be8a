//! Line-aware helpers for building text edits.

use std::ops::Range;

use treadle_syntax::node::named_children;
use treadle_syntax::{Document, Node, SyntaxError, TextEdit};

/// Widens `span` to whole lines when only whitespace surrounds it, and eats
/// one adjacent blank line so removals do not leave double gaps.
pub(crate) fn line_removal(source: &str, span: Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();
    let mut start = span.start;
    while start > 0 && matches!(bytes.get(start - 1), Some(b' ' | b'\t')) {
        start -= 1;
    }
    let mut end = span.end;
    while matches!(bytes.get(end), Some(b' ' | b'\t' | b'\r')) {
        end += 1;
    }
    let starts_line = start == 0 || bytes.get(start - 1) == Some(&b'\n');
    let ends_line = end == bytes.len() || bytes.get(end) == Some(&b'\n');
    if !(starts_line && ends_line) {
        return span;
    }
    if end < bytes.len() {
        end += 1;
    }
    let blank_before = start >= 2 && bytes.get(start - 2) == Some(&b'\n');
    if blank_before && bytes.get(end) == Some(&b'\n') {
        end += 1;
    } else if blank_before && end == bytes.len() {
        start -= 1;
    }
    start..end
}

/// Returns the start of the comment block directly above `node`, or the
/// node's own start when it has no doc comment.
pub(crate) fn doc_comment_start(node: Node<'_>) -> usize {
    let mut start = node.start_byte();
    let mut row = node.start_position().row;
    let mut current = node;
    while let Some(previous) = current.prev_named_sibling() {
        if previous.kind() != "comment" || previous.end_position().row.saturating_add(1) != row {
            break;
        }
        start = previous.start_byte();
        row = previous.start_position().row;
        current = previous;
    }
    start
}

/// Finds the top-level node starting exactly at `offset`.
pub(crate) fn top_level_at(doc: &Document, offset: usize) -> Option<Node<'_>> {
    named_children(doc.root_node())
        .into_iter()
        .find(|node| node.start_byte() == offset)
}

/// Finds the node of `kind` whose span is exactly `span`.
pub(crate) fn node_at<'doc>(doc: &'doc Document, span: &Range<usize>, kind: &str) -> Option<Node<'doc>> {
    let mut node = doc
        .root_node()
        .descendant_for_byte_range(span.start, span.end)?;
    loop {
        if node.kind() == kind && node.byte_range() == *span {
            return Some(node);
        }
        node = node.parent()?;
        if node.byte_range() != *span {
            return None;
        }
    }
}

/// Deletes a top-level declaration together with its doc comment.
pub(crate) fn remove_top_level(doc: &Document, span: &Range<usize>) -> TextEdit {
    let start = top_level_at(doc, span.start).map_or(span.start, doc_comment_start);
    TextEdit::delete(line_removal(doc.source(), start..span.end))
}

/// Applies edits, annotating syntax failures with the document path.
pub(crate) fn apply(doc: &mut Document, edits: &[TextEdit]) -> Result<bool, SyntaxError> {
    let path = doc.path().to_path_buf();
    doc.apply_edits(edits).map_err(|err| err.with_path(&path))
}
