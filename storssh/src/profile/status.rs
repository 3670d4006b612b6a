//! Immutable status-code lookup tables.

use indexmap::IndexMap;

/// Maps raw device status strings onto caller-defined values.
///
/// Built once per vendor and then only read. Lookups that miss fall back to
/// the table's default, so an unrecognised status never panics.
///
/// ```rust
/// use storssh::profile::StatusTable;
///
/// #[derive(Debug, PartialEq)]
/// enum Health { Ok, Degraded, Unknown }
///
/// let table = StatusTable::new(Health::Unknown)
///     .with("Normal", Health::Ok)
///     .with("Warning", Health::Degraded);
///
/// assert_eq!(table.lookup("Normal"), &Health::Ok);
/// assert_eq!(table.lookup("normal "), &Health::Ok);
/// assert_eq!(table.lookup("Undefined"), &Health::Unknown);
/// ```
#[derive(Debug, Clone)]
pub struct StatusTable<V> {
    entries: IndexMap<String, V>,
    default: V,
}

impl<V> StatusTable<V> {
    /// Create a table with the value returned for unknown statuses.
    pub fn new(default: V) -> Self {
        Self {
            entries: IndexMap::new(),
            default,
        }
    }

    /// Add an entry.
    pub fn with(mut self, raw: impl Into<String>, value: V) -> Self {
        self.entries.insert(raw.into(), value);
        self
    }

    /// Exact match after trimming, then ASCII case-insensitive, then default.
    pub fn lookup(&self, raw: &str) -> &V {
        self.get(raw).unwrap_or(&self.default)
    }

    /// Like [`lookup`](Self::lookup) without the fallback.
    pub fn get(&self, raw: &str) -> Option<&V> {
        let raw = raw.trim();
        self.entries.get(raw).or_else(|| {
            self.entries
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(raw))
                .map(|(_, value)| value)
        })
    }

    /// The fallback value.
    pub fn default_value(&self) -> &V {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V> Extend<(K, V)> for StatusTable<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}
