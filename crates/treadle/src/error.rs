//! Error taxonomy shared by every engine operation.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use treadle_syntax::SyntaxError;

/// Declaration kinds named in lookups and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// A `type X struct { ... }` declaration.
    Struct,
    /// A package-level `func`.
    Function,
    /// A `func` with a receiver.
    Method,
    /// A `var` specification.
    Variable,
    /// A `const` specification.
    Constant,
    /// A non-struct `type` specification.
    Type,
    /// A field inside a struct.
    Field,
    /// A source file.
    File,
}

impl DeclKind {
    /// Returns the lowercase noun used in messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Type => "type",
            Self::Field => "field",
            Self::File => "file",
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The declaration, field or file an operation targets does not exist.
    #[error("{kind} `{name}` not found")]
    NotFound {
        /// Kind of the missing item.
        kind: DeclKind,
        /// Name of the missing item.
        name: String,
    },

    /// Options were contradictory or incomplete.
    #[error("invalid options: {message}")]
    Validation {
        /// What was wrong with the options.
        message: String,
    },

    /// Source text or injected content failed to parse.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A storage operation failed.
    #[error("failed to {operation} {}: {source}", path.display())]
    Storage {
        /// Operation that failed, e.g. `read` or `rename`.
        operation: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The item an operation would add already exists.
    #[error("{kind} `{name}` already exists")]
    Duplicate {
        /// Kind of the existing item.
        kind: DeclKind,
        /// Name of the existing item.
        name: String,
    },
}

impl Error {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(kind: DeclKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(operation: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Storage {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(kind: DeclKind, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }

    /// Returns whether this is a [`Error::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns whether this is a [`Error::Validation`].
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns whether this is a [`Error::Syntax`].
    #[must_use]
    pub const fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// Returns whether this is a [`Error::Storage`].
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }

    /// Returns whether this is a [`Error::Duplicate`].
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_kind_and_item() {
        assert_eq!(
            Error::not_found(DeclKind::Struct, "User").to_string(),
            "struct `User` not found"
        );
        assert_eq!(
            Error::duplicate(DeclKind::Field, "User.ID").to_string(),
            "field `User.ID` already exists"
        );
    }

    #[test]
    fn storage_message_includes_path() {
        let err = Error::storage(
            "rename",
            Path::new("models/user.go"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_storage());
        assert_eq!(err.to_string(), "failed to rename models/user.go: denied");
    }
}
