use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag set attached to an instance or snapshot
///
/// Ordered so that logs and test assertions see a stable key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TagSet {
    data: BTreeMap<String, String>,
}

impl TagSet {
    /// Create a new empty TagSet
    pub fn new() -> Self {
        Self {
            data: BTreeMap::new(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// True when `key` is present with exactly `value`
    pub fn matches(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    /// Merge `other` into self; keys in `other` win
    pub fn extend(&mut self, other: TagSet) {
        self.data.extend(other.data);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.data.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Build from `(key, value)` pairs as returned by a tag listing.
/// Later duplicates win.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            data: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_requires_exact_value() {
        let tags = TagSet::new().with("Environment", "prod");
        assert!(tags.matches("Environment", "prod"));
        assert!(!tags.matches("Environment", "Prod"));
        assert!(!tags.matches("Name", "prod"));
    }

    #[test]
    fn test_from_pairs_last_duplicate_wins() {
        let tags: TagSet = vec![("Name", "a"), ("Name", "b")].into_iter().collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("Name"), Some("b"));
    }
}
