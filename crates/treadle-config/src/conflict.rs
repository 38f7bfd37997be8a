//! Policy names for the conflict gate consulted before a change is written.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How proposed file changes are approved.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ConflictPolicy {
    /// Show the change and wait for a `y`/`yes` answer on the terminal.
    #[default]
    Ask,
    /// Write every change without asking.
    Accept,
    /// Discard every change without asking.
    Reject,
}

/// Errors encountered while parsing a [`ConflictPolicy`] from text.
pub type ConflictPolicyParseError = strum::ParseError;
