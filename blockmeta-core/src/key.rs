//! Field keys and the meta-keys they map to.
//!
//! Hosts submit block data as a flat string map where a leading underscore
//! marks the "single value" companion of a field (the host's own reference to
//! the field definition). Inside this workspace that convention is replaced by
//! the tagged [`FieldKey`] so plain and single-value keys can never be confused.
//! The prefix only reappears at the string boundary: [`FieldKey::parse`] and
//! [`MetaKey`] rendering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved prefix of single-value keys at the host boundary.
pub const SINGLE_VALUE_PREFIX: char = '_';

/// A key inside a block instance's field payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    /// The field's value, keyed by field name.
    Plain(String),
    /// The single-value companion of the named field.
    Single(String),
}

impl FieldKey {
    /// Parse a raw host key.
    ///
    /// Returns `None` for keys that name nothing (empty, or a bare prefix).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.strip_prefix(SINGLE_VALUE_PREFIX) {
            Some("") => None,
            Some(name) => Some(FieldKey::Single(name.to_string())),
            None if raw.is_empty() => None,
            None => Some(FieldKey::Plain(raw.to_string())),
        }
    }

    /// The unprefixed field name this key refers to.
    pub fn field_name(&self) -> &str {
        match self {
            FieldKey::Plain(name) | FieldKey::Single(name) => name,
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, FieldKey::Single(_))
    }

    /// The meta-key this field key is stored under.
    pub fn meta_key(&self) -> MetaKey {
        MetaKey::from(self)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Plain(name) => f.write_str(name),
            FieldKey::Single(name) => write!(f, "{}{}", SINGLE_VALUE_PREFIX, name),
        }
    }
}

/// Key under which a redirected value lives in the document metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetaKey(String);

impl MetaKey {
    /// Meta-key of a plain field value.
    pub fn for_field(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the field key this meta-key was derived from.
    pub fn field_key(&self) -> Option<FieldKey> {
        FieldKey::parse(&self.0)
    }
}

impl From<&FieldKey> for MetaKey {
    fn from(key: &FieldKey) -> Self {
        Self(key.to_string())
    }
}

impl fmt::Display for MetaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_plain_and_single() {
        assert_eq!(
            FieldKey::parse("headline"),
            Some(FieldKey::Plain("headline".to_string()))
        );
        assert_eq!(
            FieldKey::parse("_headline"),
            Some(FieldKey::Single("headline".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_empty_names() {
        assert_eq!(FieldKey::parse(""), None);
        assert_eq!(FieldKey::parse("_"), None);
    }

    #[test]
    fn test_only_first_underscore_is_the_marker() {
        let key = FieldKey::parse("__private").unwrap();
        assert_eq!(key, FieldKey::Single("_private".to_string()));
        assert_eq!(key.field_name(), "_private");
    }

    #[test]
    fn test_meta_key_keeps_variants_apart() {
        let plain = FieldKey::Plain("headline".to_string()).meta_key();
        let single = FieldKey::Single("headline".to_string()).meta_key();
        assert_ne!(plain, single);
        assert_eq!(plain.as_str(), "headline");
        assert_eq!(single.as_str(), "_headline");
        assert_eq!(plain, MetaKey::for_field("headline"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Rendering a parsed key gives back the raw host key.
        #[test]
        fn prop_parse_display_preserves_raw_key(raw in "_?[a-z][a-z0-9_]{0,15}") {
            let key = FieldKey::parse(&raw).unwrap();
            prop_assert_eq!(key.to_string(), raw.clone());
            prop_assert_eq!(key.meta_key().field_key(), Some(key));
        }
    }
}
