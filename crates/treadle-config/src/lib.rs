//! Configuration for the treadle source-mutation engine.
//!
//! A [`Config`] can be built in code, parsed from TOML text, or loaded from a
//! TOML file. Every field has a default, so an empty document is valid:
//!
//! ```toml
//! package_name = "models"
//! conflict_policy = "accept"
//! log_filter = "treadle=debug"
//! log_format = "compact"
//! ```

mod conflict;
mod defaults;
mod logging;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use conflict::{ConflictPolicy, ConflictPolicyParseError};
pub use defaults::{DEFAULT_BACKUP_SUFFIX, DEFAULT_PACKAGE_NAME, DEFAULT_TEMP_PATTERN};
pub use logging::{DEFAULT_LOG_FILTER, LogFormat, LogFormatParseError, LogLevel};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration from {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for [`Config`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] Box<toml::de::Error>),
    /// A field holds a value the engine cannot use.
    #[error("invalid configuration value for `{field}`: {message}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Package clause used for files created from scratch.
    pub package_name: String,
    /// How proposed changes are approved.
    pub conflict_policy: ConflictPolicy,
    /// Suffix for the backup taken while a file is replaced.
    pub backup_suffix: String,
    /// Name pattern for staged files; `*` marks the unique part.
    pub temp_pattern: String,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_name: defaults::default_package_name(),
            conflict_policy: defaults::default_conflict_policy(),
            backup_suffix: defaults::default_backup_suffix(),
            temp_pattern: defaults::default_temp_pattern(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys, and
    /// [`ConfigError::Invalid`] when a value fails validation.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] when the file cannot be read, otherwise
    /// the errors of [`Config::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every field holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_go_identifier(&self.package_name) {
            return Err(ConfigError::invalid(
                "package_name",
                format!("`{}` is not a Go identifier", self.package_name),
            ));
        }
        if self.backup_suffix.is_empty() || self.backup_suffix.contains(['/', '\\']) {
            return Err(ConfigError::invalid(
                "backup_suffix",
                "must be a non-empty file name suffix",
            ));
        }
        if self.temp_pattern.matches('*').count() != 1 || self.temp_pattern.contains(['/', '\\'])
        {
            return Err(ConfigError::invalid(
                "temp_pattern",
                "must be a file name containing exactly one `*`",
            ));
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::invalid("log_filter", "must not be empty"));
        }
        if let Some(directive) = logging::invalid_directive(&self.log_filter) {
            return Err(ConfigError::invalid(
                "log_filter",
                format!("`{directive}` does not name a known level"),
            ));
        }
        Ok(())
    }

    /// Returns the configured log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns a copy with a different package name.
    #[must_use]
    pub fn with_package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    /// Returns a copy with a different conflict policy.
    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }
}

/// Returns whether `name` is a valid Go identifier.
#[must_use]
pub fn is_go_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first == '_' || first.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !GO_KEYWORDS.contains(&name)
}

const GO_KEYWORDS: [&str; 25] = [
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];
