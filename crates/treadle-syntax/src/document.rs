//! Owned, always-valid Go source files.
//!
//! A [`Document`] owns its text and the tree parsed from it. Mutation goes
//! through [`Document::apply_edits`], which reparses the edited text and
//! refuses to commit a result that no longer parses cleanly.

use std::path::{Path, PathBuf};

use crate::edit::{TextEdit, apply_edits};
use crate::error::SyntaxError;
use crate::parser::{ParseResult, Parser};

/// One parsed Go source file identified by its path.
#[derive(Debug)]
pub struct Document {
    path: PathBuf,
    parsed: ParseResult,
}

impl Document {
    /// Parses `source` into a document.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidSource`] naming `path` when the source
    /// contains syntax errors.
    pub fn parse(path: impl Into<PathBuf>, source: impl Into<String>) -> Result<Self, SyntaxError> {
        let path = path.into();
        let parsed = reparse(&source.into()).map_err(|err| err.with_path(&path))?;
        Ok(Self { path, parsed })
    }

    /// Returns the path identifying this document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Moves the document to another path without touching its content.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    /// Returns the current source text.
    #[must_use]
    pub fn source(&self) -> &str {
        self.parsed.source()
    }

    /// Returns the current syntax tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        self.parsed.tree()
    }

    /// Returns the root node of the current tree.
    #[must_use]
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.parsed.root_node()
    }

    /// Returns the source text covered by `node`.
    #[must_use]
    pub fn text(&self, node: tree_sitter::Node<'_>) -> &str {
        self.source().get(node.byte_range()).unwrap_or_default()
    }

    /// Serialises the document back to bytes.
    #[must_use]
    pub fn render(&self) -> String {
        self.source().to_owned()
    }

    /// Produces an independent copy by rendering and reparsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the rendered text fails to parse.
    pub fn reparsed(&self) -> Result<Self, SyntaxError> {
        Self::parse(self.path.clone(), self.render())
    }

    /// Applies `edits` and reparses.
    ///
    /// Returns whether the text changed. When the edited text does not parse
    /// cleanly the document keeps its previous state.
    ///
    /// # Errors
    ///
    /// Returns an edit error for invalid ranges or
    /// [`SyntaxError::InvalidSource`] when the result is malformed.
    pub fn apply_edits(&mut self, edits: &[TextEdit]) -> Result<bool, SyntaxError> {
        if edits.is_empty() {
            return Ok(false);
        }
        let updated = apply_edits(self.source(), edits)?;
        self.replace_source(updated)
    }

    /// Replaces the whole source text.
    ///
    /// Returns whether the text changed.
    ///
    /// # Errors
    ///
    /// Returns [`SyntaxError::InvalidSource`] when `source` is malformed; the
    /// document is left unchanged in that case.
    pub fn replace_source(&mut self, source: String) -> Result<bool, SyntaxError> {
        if source == self.source() {
            return Ok(false);
        }
        self.parsed = reparse(&source).map_err(|err| err.with_path(&self.path))?;
        Ok(true)
    }
}

fn reparse(source: &str) -> Result<ParseResult, SyntaxError> {
    let parsed = Parser::new()?.parse(source)?;
    parsed.check()?;
    Ok(parsed)
}
