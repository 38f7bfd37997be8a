use crate::conflict::ConflictPolicy;
use crate::logging::{DEFAULT_LOG_FILTER, LogFormat};

/// Package clause written into files the engine creates from scratch.
pub const DEFAULT_PACKAGE_NAME: &str = "main";

/// Suffix appended to a target path while its replacement is moved into place.
pub const DEFAULT_BACKUP_SUFFIX: &str = ".backup";

/// Pattern for staged files; `*` is replaced by a unique token.
pub const DEFAULT_TEMP_PATTERN: &str = ".treadle-*.go";

/// Owned package name used where allocation is required (e.g. serde).
pub fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_owned()
}

/// Owned backup suffix used where allocation is required (e.g. serde).
pub fn default_backup_suffix() -> String {
    DEFAULT_BACKUP_SUFFIX.to_owned()
}

/// Owned temp pattern used where allocation is required (e.g. serde).
pub fn default_temp_pattern() -> String {
    DEFAULT_TEMP_PATTERN.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default conflict policy.
pub const fn default_conflict_policy() -> ConflictPolicy {
    ConflictPolicy::Ask
}
