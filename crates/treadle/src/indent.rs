//! Line re-indentation that leaves raw string literals alone.
//!
//! A line whose start falls inside a raw string literal keeps its leading
//! whitespace, and a line whose end falls inside one keeps its trailing
//! whitespace. Everything else is re-indented freely.

use std::ops::Range;

use treadle_syntax::Parser;
use treadle_syntax::node::raw_string_ranges;

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    /// The line starts inside a raw string literal.
    verbatim_start: bool,
    /// The line break after the line sits inside a raw string literal.
    verbatim_end: bool,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        !self.verbatim_start && self.text.trim().is_empty()
    }

    fn trimmed_end(&self) -> &str {
        if self.verbatim_end {
            self.text
        } else {
            self.text.trim_end()
        }
    }
}

fn inside(ranges: &[Range<usize>], offset: usize) -> bool {
    ranges
        .iter()
        .any(|range| range.start < offset && offset < range.end)
}

/// Splits `text` into lines, marking which edges sit inside `raw`.
///
/// `raw` holds byte ranges relative to the start of `text`.
fn classify<'a>(text: &'a str, raw: &[Range<usize>]) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    let mut start = 0_usize;
    for piece in text.split('\n') {
        let end = start.saturating_add(piece.len());
        lines.push(Line {
            text: piece,
            verbatim_start: inside(raw, start),
            verbatim_end: inside(raw, end),
        });
        start = end.saturating_add(1);
    }
    lines
}

/// Removes the indentation shared by the lines of `text`, dropping blank
/// lines at either end.
pub(crate) fn dedent(text: &str, raw: &[Range<usize>]) -> String {
    let lines = classify(text, raw);
    let first = lines.iter().position(|line| !line.is_blank());
    let last = lines.iter().rposition(|line| !line.is_blank());
    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let kept = lines.get(first..=last).unwrap_or_default();
    let indent = common_indent(
        kept.iter()
            .filter(|line| !line.verbatim_start && !line.is_blank())
            .map(|line| line.text),
    );
    kept.iter()
        .map(|line| {
            if line.verbatim_start {
                line.text
            } else if line.is_blank() {
                ""
            } else {
                line.trimmed_end().get(indent..).unwrap_or(line.text)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indents every non-blank line of `text` by one tab.
pub(crate) fn indent(text: &str, raw: &[Range<usize>]) -> String {
    classify(text, raw)
        .iter()
        .map(|line| {
            if line.verbatim_start {
                line.text.to_owned()
            } else if line.is_blank() {
                String::new()
            } else {
                format!("\t{}", line.trimmed_end())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finds the raw string literals of a function body given as plain text.
///
/// The body is parsed inside a scratch function; text that does not parse
/// still reports the literals the parser recovered.
pub(crate) fn body_raw_strings(body: &str) -> Vec<Range<usize>> {
    const PREFIX: &str = "package scratch\n\nfunc _() {\n";
    let wrapped = format!("{PREFIX}{body}\n}}\n");
    let Ok(parsed) = Parser::new().and_then(|mut parser| parser.parse(&wrapped)) else {
        return Vec::new();
    };
    raw_string_ranges(parsed.root_node())
        .into_iter()
        .filter(|range| range.start >= PREFIX.len())
        .map(|range| {
            range.start.saturating_sub(PREFIX.len())..range.end.saturating_sub(PREFIX.len())
        })
        .collect()
}

fn common_indent<'a>(mut lines: impl Iterator<Item = &'a str>) -> usize {
    let Some(first) = lines.next() else {
        return 0;
    };
    let mut prefix: &str = leading_whitespace(first);
    for line in lines {
        let shared = prefix
            .chars()
            .zip(leading_whitespace(line).chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum::<usize>();
        prefix = prefix.get(..shared).unwrap_or_default();
    }
    prefix.len()
}

fn leading_whitespace(line: &str) -> &str {
    let end = line
        .len()
        .saturating_sub(line.trim_start_matches([' ', '\t']).len());
    line.get(..end).unwrap_or_default()
}
