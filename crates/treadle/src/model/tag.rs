//! Struct tag parsing and rendering.
//!
//! Tags are kept as an ordered list of `key:"value"` pairs so that rewriting
//! a single key does not reorder the rest.

use std::fmt;

/// An ordered set of struct tag entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTag {
    entries: Vec<(String, String)>,
}

impl StructTag {
    /// Creates an empty tag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builds a tag from key/value pairs, keeping their order.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut tag = Self::new();
        for (key, value) in pairs {
            tag.set(key, value);
        }
        tag
    }

    /// Parses a tag literal such as `` `json:"id" db:"user_id"` ``.
    ///
    /// Surrounding backticks or quotes are optional. Malformed trailing input
    /// is ignored, matching how Go's reflection treats tags.
    #[must_use]
    pub fn parse(literal: &str) -> Self {
        let mut rest = literal.trim().trim_matches('`').trim();
        let mut tag = Self::new();
        while !rest.is_empty() {
            let Some((key, after_key)) = rest.split_once(":\"") else {
                break;
            };
            let Some(end) = closing_quote(after_key) else {
                break;
            };
            let value = after_key.get(..end).unwrap_or_default();
            tag.set(key.trim(), value.replace("\\\"", "\""));
            rest = after_key.get(end.saturating_add(1)..).unwrap_or_default().trim_start();
        }
        tag
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Replaces the value of `key`, or appends it when absent.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let wanted = key.into();
        let replacement = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == wanted) {
            Some(entry) => entry.1 = replacement,
            None => self.entries.push((wanted, replacement)),
        }
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != key);
        before != self.entries.len()
    }

    /// Returns whether the tag has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Renders the tag as a raw string literal, or `None` when empty.
    #[must_use]
    pub fn to_literal(&self) -> Option<String> {
        (!self.is_empty()).then(|| format!("`{self}`"))
    }
}

impl fmt::Display for StructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (key, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}:\"{}\"", value.replace('"', "\\\""))?;
        }
        Ok(())
    }
}

/// Wraps an annotation in backticks unless it is already a string literal.
#[must_use]
pub fn normalise_annotation(annotation: &str) -> Option<String> {
    let trimmed = annotation.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('`') || trimmed.starts_with('"') {
        Some(trimmed.to_owned())
    } else {
        Some(format!("`{trimmed}`"))
    }
}

fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(index),
            _ => escaped = false,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn parses_multiple_keys_in_order() {
        let tag = StructTag::parse("`json:\"id\" db:\"user_id,pk\"`");
        let entries: Vec<_> = tag.iter().collect();
        assert_eq!(entries, vec![("json", "id"), ("db", "user_id,pk")]);
    }

    #[test]
    fn set_replaces_existing_key_in_place() {
        let mut tag = StructTag::parse("json:\"id\" db:\"id\"");
        tag.set("json", "user_id");
        assert_eq!(tag.to_string(), "json:\"user_id\" db:\"id\"");
    }

    #[test]
    fn renders_literal_with_backticks() {
        let tag = StructTag::from_pairs([("json", "name"), ("xml", "n")]);
        assert_eq!(tag.to_literal().as_deref(), Some("`json:\"name\" xml:\"n\"`"));
        assert_eq!(StructTag::new().to_literal(), None);
    }

    #[test]
    fn escaped_quotes_survive_round_trip() {
        let tag = StructTag::parse(r#"`doc:"say \"hi\""`"#);
        assert_eq!(tag.get("doc"), Some("say \"hi\""));
        assert_eq!(tag.to_string(), r#"doc:"say \"hi\"""#);
    }

    #[rstest]
    #[case("json:\"id\"", Some("`json:\"id\"`"))]
    #[case("`json:\"id\"`", Some("`json:\"id\"`"))]
    #[case("  ", None)]
    fn annotations_gain_backticks(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalise_annotation(input).as_deref(), expected);
    }
}
