//! Error types for parsing and editing Go sources.
//!
//! Every fallible operation in `treadle-syntax` reports one of these
//! variants. Positions carried by the variants are one-based.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::parser::SyntaxErrorInfo;

/// Errors from parsing and editing operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyntaxError {
    /// Failed to initialise the Tree-sitter parser for Go.
    #[error("failed to initialise Go parser: {message}")]
    ParserInitError {
        /// Description of the failure.
        message: String,
    },

    /// Tree-sitter gave up on the input without producing a tree.
    #[error("failed to parse Go source: {message}")]
    ParseError {
        /// Description of the failure.
        message: String,
    },

    /// The source parsed, but the tree contains error or missing nodes.
    #[error("{}", describe_invalid(path.as_deref(), failures))]
    InvalidSource {
        /// File the source belongs to, when known.
        path: Option<PathBuf>,
        /// Every syntax problem reported by the parser.
        failures: Vec<SyntaxErrorInfo>,
    },

    /// A text edit could not be applied to the source buffer.
    #[error("invalid edit: {message}")]
    EditError {
        /// Description of the rejected edit.
        message: String,
    },

    /// Internal error indicating a bug or system failure.
    #[error("internal error: {message}")]
    InternalError {
        /// Description of the internal error.
        message: String,
    },
}

impl SyntaxError {
    /// Creates a parser initialisation error.
    #[must_use]
    pub fn parser_init(message: impl Into<String>) -> Self {
        Self::ParserInitError {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Creates an invalid source error for the given failures.
    #[must_use]
    pub const fn invalid_source(path: Option<PathBuf>, failures: Vec<SyntaxErrorInfo>) -> Self {
        Self::InvalidSource { path, failures }
    }

    /// Creates an edit error.
    #[must_use]
    pub fn edit(message: impl Into<String>) -> Self {
        Self::EditError {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Attaches a file path to an [`SyntaxError::InvalidSource`] that lacks one.
    #[must_use]
    pub fn with_path(self, file: &Path) -> Self {
        match self {
            Self::InvalidSource {
                path: None,
                failures,
            } => Self::InvalidSource {
                path: Some(file.to_path_buf()),
                failures,
            },
            other => other,
        }
    }

    /// Returns the parser failures carried by this error, if any.
    #[must_use]
    pub fn failures(&self) -> &[SyntaxErrorInfo] {
        match self {
            Self::InvalidSource { failures, .. } => failures,
            _ => &[],
        }
    }
}

fn describe_invalid(path: Option<&Path>, failures: &[SyntaxErrorInfo]) -> String {
    let location = path.map_or_else(|| "<source>".to_owned(), |p| p.display().to_string());
    match failures.first() {
        Some(first) if failures.len() > 1 => format!(
            "{location}:{}:{}: {} (and {} more)",
            first.line,
            first.column,
            first.message,
            failures.len().saturating_sub(1)
        ),
        Some(first) => format!(
            "{location}:{}:{}: {}",
            first.line, first.column, first.message
        ),
        None => format!("{location}: invalid Go source"),
    }
}
