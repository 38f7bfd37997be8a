//! Tree-sitter parsing wrapper with error recovery.
//!
//! This module provides a high-level interface for parsing Go source code
//! using Tree-sitter. It wraps the raw Tree-sitter parser and provides
//! structured access to parse results and syntax errors.

use std::ops::Range;

use crate::error::SyntaxError;
use crate::position::point_to_one_based;

/// Result of parsing source code.
///
/// Contains the parsed syntax tree along with the source it was built from.
/// Tree-sitter is error-tolerant, so a parse result may contain both a valid
/// tree and error nodes.
#[derive(Debug, Clone)]
pub struct ParseResult {
    tree: tree_sitter::Tree,
    source: String,
}

impl ParseResult {
    /// Returns the parsed syntax tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Returns the source code that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the parse result contains any syntax errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Collects all syntax errors found in the parse result.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxErrorInfo> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &self.source, &mut errors);
        errors
    }

    /// Converts a tree with error nodes into [`SyntaxError::InvalidSource`].
    ///
    /// # Errors
    ///
    /// Returns an error listing every failure when the tree is not clean.
    pub fn check(&self) -> Result<(), SyntaxError> {
        if self.has_errors() {
            return Err(SyntaxError::invalid_source(None, self.errors()));
        }
        Ok(())
    }

    /// Returns the root node of the syntax tree.
    #[must_use]
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Splits the result into its tree and source.
    #[must_use]
    pub fn into_parts(self) -> (tree_sitter::Tree, String) {
        (self.tree, self.source)
    }
}

/// Information about a syntax error found during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the error in the source.
    pub byte_range: Range<usize>,
    /// Line number (one-based) where the error starts.
    pub line: u32,
    /// Column number (one-based) where the error starts.
    pub column: u32,
    /// A snippet of the problematic source text.
    pub context: String,
    /// Human-readable description of the error.
    pub message: String,
}

impl SyntaxErrorInfo {
    fn from_node(node: tree_sitter::Node<'_>, source: &str) -> Self {
        let byte_range = node.byte_range();
        let context = source
            .get(byte_range.clone())
            .map(|s| {
                if s.chars().count() > 50 {
                    let truncated: String = s.chars().take(47).collect();
                    format!("{truncated}...")
                } else {
                    s.to_owned()
                }
            })
            .unwrap_or_default();

        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            "syntax error".to_owned()
        };

        let (line, column) = point_to_one_based(node.start_position());

        Self {
            byte_range,
            line,
            column,
            context,
            message,
        }
    }
}

/// Tree-sitter parser configured for Go.
pub struct Parser {
    inner: tree_sitter::Parser,
}

impl Parser {
    /// Creates a new Go parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the Tree-sitter grammar is incompatible with the
    /// linked runtime.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_go::LANGUAGE.into();
        inner
            .set_language(&language)
            .map_err(|err| SyntaxError::parser_init(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses source code and returns the result.
    ///
    /// The result may contain error nodes; use [`ParseResult::check`] to
    /// reject them.
    ///
    /// # Errors
    ///
    /// Returns an error if the parser fails to produce a syntax tree.
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, SyntaxError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse("parsing failed"))?;

        Ok(ParseResult {
            tree,
            source: source.to_owned(),
        })
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser").finish_non_exhaustive()
    }
}

/// Parses `source` and rejects it when the tree contains errors.
///
/// # Errors
///
/// Returns [`SyntaxError::InvalidSource`] when the source is malformed, or a
/// parser error when Tree-sitter cannot be initialised.
pub fn parse_checked(source: &str) -> Result<ParseResult, SyntaxError> {
    let parsed = Parser::new()?.parse(source)?;
    parsed.check()?;
    Ok(parsed)
}

fn collect_error_nodes(
    node: tree_sitter::Node<'_>,
    source: &str,
    errors: &mut Vec<SyntaxErrorInfo>,
) {
    if node.is_error() || node.is_missing() {
        errors.push(SyntaxErrorInfo::from_node(node, source));
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, source, errors);
    }
}
