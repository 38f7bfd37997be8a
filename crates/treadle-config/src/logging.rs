//! Log output settings: the output format and the filter directives the
//! engine's subscriber accepts.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default filter: every event at `info` or more severe.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// How the engine renders log events.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event.
    #[default]
    Json,
    /// One short human-readable line per event.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Verbosity a filter directive may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    /// Nothing is logged.
    Off,
    /// Failures only.
    Error,
    /// Best-effort cleanup failures and worse.
    Warn,
    /// Persisted changes and worse.
    Info,
    /// Lookups, no-op merges and replacements.
    Debug,
    /// Everything.
    Trace,
}

/// Returns the first directive of `filter` whose level is not a
/// [`LogLevel`].
///
/// Directives are comma separated. A directive is a bare level, a bare
/// target, or `target=level`; empty pieces are ignored.
pub(crate) fn invalid_directive(filter: &str) -> Option<&str> {
    filter
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .find(|directive| !is_valid_directive(directive))
}

fn is_valid_directive(directive: &str) -> bool {
    match directive.rsplit_once('=') {
        Some((target, level)) => {
            !target.trim().is_empty() && level.trim().parse::<LogLevel>().is_ok()
        }
        None => !directive.contains(char::is_whitespace),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("info")]
    #[case("treadle=debug")]
    #[case(DEFAULT_LOG_FILTER)]
    #[case("warn,treadle::apply=TRACE,")]
    #[case("treadle")]
    fn accepted_filters(#[case] filter: &str) {
        assert_eq!(invalid_directive(filter), None);
    }

    #[rstest]
    #[case("treadle=loud", "treadle=loud")]
    #[case("info, =debug", "=debug")]
    #[case("tree sitter", "tree sitter")]
    fn rejected_filters_name_the_directive(#[case] filter: &str, #[case] expected: &str) {
        assert_eq!(invalid_directive(filter), Some(expected));
    }

    #[test]
    fn levels_order_by_verbosity() {
        assert!(LogLevel::Off < LogLevel::Error);
        assert!(LogLevel::Debug < LogLevel::Trace);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }
}
