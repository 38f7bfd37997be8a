//! Tree-sitter powered Go syntax service for the treadle engine.
//!
//! This crate turns Go source text into syntax trees and back:
//!
//! - [`Parser`] and [`ParseResult`] wrap Tree-sitter with the Go grammar and
//!   report syntax errors with one-based positions.
//! - [`Document`] owns one file's text and tree, applying [`TextEdit`]s only
//!   when the edited text still parses cleanly.
//! - [`node`] holds traversal helpers shared by the declaration model.
//!
//! # Example
//!
//! ```
//! use treadle_syntax::{Document, TextEdit};
//!
//! let mut doc = Document::parse("main.go", "package main\n")?;
//! doc.apply_edits(&[TextEdit::replace(8..12, "models")])?;
//! assert_eq!(doc.render(), "package models\n");
//! # Ok::<(), treadle_syntax::SyntaxError>(())
//! ```

mod document;
mod edit;
mod error;
pub mod node;
mod parser;
mod position;

pub use document::Document;
pub use edit::{TextEdit, apply_edits};
pub use error::SyntaxError;
pub use parser::{ParseResult, Parser, SyntaxErrorInfo, parse_checked};
pub use position::offset_to_line_column;
pub use tree_sitter::Node;
