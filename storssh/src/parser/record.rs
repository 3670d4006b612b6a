//! The Record type: one parsed entity.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered field-name → field-value map for one logical entity (one disk,
/// one pool, ...).
///
/// Keys keep source order. Inserting a key that is already present never
/// overwrites: the new value is stored under `key1`, `key2`, ... instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

/// Records are equal when they hold the same fields in the same order.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.fields.iter().eq(other.fields.iter())
    }
}

impl Eq for Record {}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, disambiguating a repeated key.
    ///
    /// Returns the key the value was actually stored under.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &str {
        let mut key = key.into();
        if self.fields.contains_key(&key) {
            let base = key;
            let mut n = 1usize;
            key = loop {
                let candidate = format!("{base}{n}");
                if !self.fields.contains_key(&candidate) {
                    break candidate;
                }
                n += 1;
            };
        }
        let (index, _) = self.fields.insert_full(key, value.into());
        self.fields
            .get_index(index)
            .map(|(k, _)| k.as_str())
            .unwrap_or_default()
    }

    /// Get a field value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Get a field value, or `default` if absent.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parse a field value; `None` if absent or unparsable.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field names in source order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Unwrap into the underlying ordered map.
    pub fn into_inner(self) -> IndexMap<String, String> {
        self.fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_key_gets_suffix() {
        let mut record = Record::new();
        assert_eq!(record.insert("Memory#0", "Normal"), "Memory#0");
        assert_eq!(record.insert("Memory#0", "Undefined"), "Memory#01");
        assert_eq!(record.insert("Memory#0", "Error"), "Memory#02");
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["Memory#0", "Memory#01", "Memory#02"]
        );
    }

    #[test]
    fn test_suffix_skips_taken_names() {
        let mut record = Record::new();
        record.insert("port", "a");
        record.insert("port1", "b");
        assert_eq!(record.insert("port", "c"), "port2");
        assert_eq!(record.get("port1"), Some("b"));
    }

    #[test]
    fn test_getters() {
        let record: Record = [("total", " 100 "), ("name", "pool-a")].into_iter().collect();
        assert_eq!(record.get_as::<u64>("total"), Some(100));
        assert_eq!(record.get_as::<u64>("name"), None);
        assert_eq!(record.get_or("missing", "-"), "-");
        assert!(record.contains_key("name"));
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let record: Record = [("b", "2"), ("a", "1")].into_iter().collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"b":"2","a":"1"}"#);
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
