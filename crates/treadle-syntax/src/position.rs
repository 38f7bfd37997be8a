//! Shared position conversion helpers.
//!
//! Tree-sitter positions are zero-based. For user-facing messages, we prefer
//! one-based line and column numbers.

/// Converts a Tree-sitter position (0-based) to one-based display coordinates.
#[must_use]
pub(crate) fn point_to_one_based(pos: tree_sitter::Point) -> (u32, u32) {
    let line = u32::try_from(pos.row.saturating_add(1)).unwrap_or(u32::MAX);
    let column = u32::try_from(pos.column.saturating_add(1)).unwrap_or(u32::MAX);
    (line, column)
}

/// Converts a byte offset into a one-based line and column pair.
///
/// Offsets past the end of `source` clamp to the final position.
#[must_use]
pub fn offset_to_line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut row = 0_usize;
    let mut line_start = 0_usize;
    for (index, byte) in source.bytes().enumerate() {
        if index >= offset {
            break;
        }
        if byte == b'\n' {
            row = row.saturating_add(1);
            line_start = index.saturating_add(1);
        }
    }
    let column = offset.min(source.len()).saturating_sub(line_start);
    point_to_one_based(tree_sitter::Point { row, column })
}
