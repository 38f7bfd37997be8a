//! gofmt-style source synthesis.
//!
//! Rendering follows gofmt's layout rules closely enough that generated
//! declarations survive a later `gofmt` pass unchanged: tab indentation,
//! struct fields aligned with tabwriter semantics and one blank line between
//! top-level declarations.

use crate::indent;
use crate::model::Parameter;

/// One line of a struct body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyItem {
    /// A field declaration, possibly naming several fields.
    Field(FieldLine),
    /// A standalone comment line.
    Comment(String),
    /// An empty separator line.
    Blank,
}

/// A field declaration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldLine {
    /// Declared names; empty for embedded fields.
    pub(crate) names: Vec<String>,
    /// Type expression.
    pub(crate) type_expr: String,
    /// Tag literal including quotes.
    pub(crate) tag: Option<String>,
    /// Trailing comment including its marker.
    pub(crate) comment: Option<String>,
}

impl FieldLine {
    pub(crate) fn new(name: &str, type_expr: &str, tag: Option<String>) -> Self {
        Self {
            names: vec![name.to_owned()],
            type_expr: type_expr.trim().to_owned(),
            tag,
            comment: None,
        }
    }

    fn cells(&self) -> Vec<String> {
        let mut cells = Vec::with_capacity(4);
        if !self.names.is_empty() {
            cells.push(self.names.join(", "));
        }
        cells.push(self.type_expr.clone());
        if let Some(tag) = &self.tag {
            cells.push(tag.clone());
        }
        if let Some(comment) = &self.comment {
            cells.push(comment.clone());
        }
        cells
    }
}

enum Row {
    Cells(Vec<String>),
    Raw(String),
}

impl Row {
    /// Whether `column` is a padded cell on this row.
    fn pads(&self, column: usize) -> bool {
        match self {
            Self::Cells(cells) => {
                cells.len() > column.saturating_add(1)
                    && cells.get(column).is_some_and(|cell| !cell.contains('\n'))
            }
            Self::Raw(_) => false,
        }
    }

    fn cell_width(&self, column: usize) -> usize {
        match self {
            Self::Cells(cells) => cells.get(column).map_or(0, |cell| cell.chars().count()),
            Self::Raw(_) => 0,
        }
    }
}

/// Aligns rows using tabwriter rules: a column is padded to the widest cell
/// of each run of consecutive rows that have a following cell.
fn align(rows: &[Row]) -> Vec<String> {
    let columns = rows
        .iter()
        .map(|row| match row {
            Row::Cells(cells) => cells.len(),
            Row::Raw(_) => 0,
        })
        .max()
        .unwrap_or(0);
    let mut widths: Vec<Vec<usize>> = rows.iter().map(|_| vec![0; columns]).collect();

    for column in 0..columns {
        let mut start = 0;
        while start < rows.len() {
            if !rows.get(start).is_some_and(|row| row.pads(column)) {
                start = start.saturating_add(1);
                continue;
            }
            let mut end = start;
            while rows.get(end).is_some_and(|row| row.pads(column)) {
                end = end.saturating_add(1);
            }
            let width = rows
                .get(start..end)
                .unwrap_or_default()
                .iter()
                .map(|row| row.cell_width(column))
                .max()
                .unwrap_or(0);
            for row_widths in widths.get_mut(start..end).unwrap_or_default() {
                if let Some(slot) = row_widths.get_mut(column) {
                    *slot = width;
                }
            }
            start = end;
        }
    }

    rows.iter()
        .zip(widths)
        .map(|(row, row_widths)| match row {
            Row::Raw(text) => text.clone(),
            Row::Cells(cells) => {
                let mut line = String::new();
                let last = cells.len().saturating_sub(1);
                for (index, cell) in cells.iter().enumerate() {
                    line.push_str(cell);
                    if index < last {
                        let width = row_widths.get(index).copied().unwrap_or(0);
                        let padding = width.saturating_sub(cell.chars().count()).saturating_add(1);
                        line.push_str(&" ".repeat(padding));
                    }
                }
                line
            }
        })
        .collect()
}

/// Renders a struct type expression such as `struct {\n\tID int\n}`.
pub(crate) fn struct_type(items: &[BodyItem]) -> String {
    if items.iter().all(|item| matches!(item, BodyItem::Blank)) {
        return "struct{}".to_owned();
    }
    let rows: Vec<Row> = items
        .iter()
        .map(|item| match item {
            BodyItem::Field(field) => Row::Cells(field.cells()),
            BodyItem::Comment(text) => Row::Raw(text.clone()),
            BodyItem::Blank => Row::Raw(String::new()),
        })
        .collect();
    let mut out = String::from("struct {\n");
    for line in align(&rows) {
        if !line.is_empty() {
            out.push('\t');
            out.push_str(&line);
        }
        out.push('\n');
    }
    out.push('}');
    out
}

/// Renders `type Name struct { ... }`.
pub(crate) fn struct_declaration(
    name: &str,
    type_parameters: Option<&str>,
    items: &[BodyItem],
) -> String {
    format!(
        "type {name}{} {}",
        type_parameters.unwrap_or_default(),
        struct_type(items)
    )
}

/// Signature parts of a function or method.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Signature<'a> {
    pub(crate) receiver: Option<(&'a str, &'a str)>,
    pub(crate) name: &'a str,
    pub(crate) parameters: &'a [Parameter],
    pub(crate) result: Option<&'a str>,
}

/// Renders a complete function or method declaration.
pub(crate) fn function_declaration(signature: Signature<'_>, body: &str) -> String {
    let mut header = String::from("func ");
    if let Some((name, type_expr)) = signature.receiver {
        header.push_str(&format!("({name} {}) ", type_expr.trim()));
    }
    header.push_str(signature.name);
    header.push_str(&parameter_list(signature.parameters));
    if let Some(result) = signature.result.and_then(result_clause) {
        header.push(' ');
        header.push_str(&result);
    }
    format!("{header} {}", block(body))
}

/// Renders a function or method from raw text following its name.
pub(crate) fn raw_function_declaration(receiver: Option<(&str, &str)>, name: &str, rest: &str) -> String {
    let prefix = receiver
        .map(|(recv_name, type_expr)| format!("({recv_name} {}) ", type_expr.trim()))
        .unwrap_or_default();
    format!("func {prefix}{name}{}", rest.trim())
}

/// Renders `(a int, b string)`.
pub(crate) fn parameter_list(parameters: &[Parameter]) -> String {
    let rendered: Vec<String> = parameters
        .iter()
        .map(|param| {
            if param.name.trim().is_empty() {
                param.type_expr.trim().to_owned()
            } else {
                format!("{} {}", param.name.trim(), param.type_expr.trim())
            }
        })
        .collect();
    format!("({})", rendered.join(", "))
}

/// Normalises a result list, adding parentheses around multiple results.
pub(crate) fn result_clause(result: &str) -> Option<String> {
    let trimmed = result.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('(') || !has_top_level_comma(trimmed) {
        return Some(trimmed.to_owned());
    }
    Some(format!("({trimmed})"))
}

fn has_top_level_comma(text: &str) -> bool {
    let mut depth = 0_i32;
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth = depth.saturating_add(1),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Renders a block, indenting every non-empty body line by one tab.
///
/// Lines inside raw string literals are copied unchanged.
pub(crate) fn block(body: &str) -> String {
    let trimmed = body.trim_matches('\n');
    if trimmed.trim().is_empty() {
        return "{\n}".to_owned();
    }
    let raw = indent::body_raw_strings(trimmed);
    format!("{{\n{}\n}}", indent::indent(trimmed, &raw))
}

/// Renders the specification part of a `var`/`const`: `Name Type = Value`.
pub(crate) fn value_spec(name: &str, type_expr: Option<&str>, value: Option<&str>) -> String {
    let mut spec = name.to_owned();
    if let Some(written) = type_expr.map(str::trim).filter(|t| !t.is_empty()) {
        spec.push(' ');
        spec.push_str(written);
    }
    if let Some(expr) = value.map(str::trim).filter(|v| !v.is_empty()) {
        spec.push_str(" = ");
        spec.push_str(expr);
    }
    spec
}

/// Renders the specification part of a `type`: `Name Definition`.
///
/// A definition starting with `=` produces an alias.
pub(crate) fn type_spec(name: &str, definition: &str) -> String {
    let trimmed = definition.trim();
    match trimmed.strip_prefix('=') {
        Some(aliased) => format!("{name} = {}", aliased.trim()),
        None => format!("{name} {trimmed}"),
    }
}

/// Splits a `var`/`const` specification into aligned cells.
pub(crate) fn value_cells(name: &str, type_expr: Option<&str>, value: Option<&str>) -> Vec<String> {
    let mut cells = vec![name.to_owned()];
    if let Some(written) = type_expr.map(str::trim).filter(|t| !t.is_empty()) {
        cells.push(written.to_owned());
    }
    if let Some(expr) = value.map(str::trim).filter(|v| !v.is_empty()) {
        cells.push(format!("= {expr}"));
    }
    cells
}

/// Renders `keyword spec` for one row or a parenthesised, aligned group for
/// several.
pub(crate) fn grouped_declaration(keyword: &str, rows: &[Vec<String>]) -> String {
    if let [row] = rows {
        return format!("{keyword} {}", row.join(" "));
    }
    let rows: Vec<Row> = rows.iter().cloned().map(Row::Cells).collect();
    let mut out = format!("{keyword} (\n");
    for line in align(&rows) {
        out.push('\t');
        out.push_str(&line);
        out.push('\n');
    }
    out.push(')');
    out
}

/// Appends a declaration after the existing content of a file.
pub(crate) fn append_declaration(source: &str, declaration: &str) -> String {
    format!("{}\n\n{}\n", source.trim_end(), declaration.trim_end())
}

/// Picks a receiver name from the receiver type: the lowercased first letter
/// of the base type, or `r`.
pub(crate) fn default_receiver_name(receiver_type: &str) -> String {
    crate::model::base_type_name(receiver_type)
        .chars()
        .next()
        .filter(|c| c.is_alphabetic())
        .map_or_else(|| "r".to_owned(), |c| c.to_lowercase().collect())
}
