//! Byte-range text edits.
//!
//! Edits are expressed against the original buffer and applied from the end
//! of the buffer towards the start so earlier offsets stay valid.

use std::ops::Range;

use crate::error::SyntaxError;

/// A replacement of one byte range in a source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    range: Range<usize>,
    replacement: String,
}

impl TextEdit {
    /// Replaces `range` with `replacement`.
    #[must_use]
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    /// Inserts `text` at `offset`.
    #[must_use]
    pub fn insert_at(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset..offset, text)
    }

    /// Deletes `range`.
    #[must_use]
    pub fn delete(range: Range<usize>) -> Self {
        Self::replace(range, String::new())
    }

    /// Returns the byte range replaced by this edit.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns the replacement text.
    #[must_use]
    pub fn replacement(&self) -> &str {
        &self.replacement
    }
}

/// Applies `edits` to `original`, producing a new buffer.
///
/// # Errors
///
/// Returns [`SyntaxError::EditError`] when an edit is out of bounds, splits a
/// UTF-8 character or overlaps another edit.
pub fn apply_edits(original: &str, edits: &[TextEdit]) -> Result<String, SyntaxError> {
    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| {
        b.range
            .start
            .cmp(&a.range.start)
            .then_with(|| b.range.end.cmp(&a.range.end))
    });

    let mut result = original.to_owned();
    let mut previous_start = usize::MAX;
    for edit in ordered {
        let Range { start, end } = edit.range;
        if start > end || end > original.len() {
            return Err(SyntaxError::edit(format!(
                "range {start}..{end} is outside a buffer of {} bytes",
                original.len()
            )));
        }
        if !original.is_char_boundary(start) || !original.is_char_boundary(end) {
            return Err(SyntaxError::edit(format!(
                "range {start}..{end} does not fall on character boundaries"
            )));
        }
        if end > previous_start {
            return Err(SyntaxError::edit(format!(
                "range {start}..{end} overlaps another edit"
            )));
        }
        result.replace_range(start..end, &edit.replacement);
        previous_start = start;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_edits_produce(original: &str, edits: &[TextEdit], expected: &str) {
        let result = apply_edits(original, edits).expect("edit should succeed");
        assert_eq!(result, expected);
    }

    #[test]
    fn inserts_text() {
        assert_edits_produce(
            "hello world",
            &[TextEdit::insert_at(6, "beautiful ")],
            "hello beautiful world",
        );
    }

    #[test]
    fn deletes_text() {
        assert_edits_produce("hello beautiful world", &[TextEdit::delete(6..16)], "hello world");
    }

    #[test]
    fn applies_several_edits_against_original_offsets() {
        assert_edits_produce(
            "aaa bbb ccc",
            &[
                TextEdit::replace(0..3, "A"),
                TextEdit::replace(8..11, "CCCCC"),
            ],
            "A bbb CCCCC",
        );
    }

    #[test]
    fn rejects_overlapping_edits() {
        let result = apply_edits(
            "abcdef",
            &[TextEdit::replace(0..4, "x"), TextEdit::replace(2..5, "y")],
        );
        assert!(matches!(result, Err(SyntaxError::EditError { .. })));
    }

    #[test]
    fn rejects_out_of_bounds_edit() {
        let result = apply_edits("abc", &[TextEdit::delete(2..9)]);
        assert!(matches!(result, Err(SyntaxError::EditError { .. })));
    }

    #[test]
    fn rejects_split_character() {
        let result = apply_edits("héllo", &[TextEdit::delete(0..2)]);
        assert!(matches!(result, Err(SyntaxError::EditError { .. })));
    }
}
