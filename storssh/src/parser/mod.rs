//! Generic parsing of CLI output into ordered records.
//!
//! Every driver feeds raw response text through the same [`RecordParser`]
//! with a [`ParseSpec`] describing the layout, instead of hand-rolling a
//! splitter per vendor. Parsing never fails on input: lines that do not fit
//! the layout are dropped and parsing continues.
//!
//! ```rust
//! use storssh::parser::{KeyValueSpec, RecordParser, TableSpec};
//!
//! let parser = RecordParser::new();
//!
//! let records = parser.parse(
//!     "Name [box1]\nStatus [OK]\n\nName [box2]\nStatus [Fail]\n",
//!     &KeyValueSpec::bracket().into(),
//! );
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1].get("Status"), Some("Fail"));
//!
//! let pools = parser.parse("id,name\n1,pool-a\n", &TableSpec::delimited(',').into());
//! assert_eq!(pools[0].get("name"), Some("pool-a"));
//! ```

mod keyvalue;
mod record;
mod spec;
mod table;

pub use record::Record;
pub use spec::{
    Boundary, ColumnDelimiter, HeaderRule, KeyValueDelimiter, KeyValueSpec, LayoutKind,
    ParseSpec, TableSpec,
};

/// Stateless parser shared across devices and threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser;

impl RecordParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse text into records, in source order. Empty text yields no records.
    pub fn parse(&self, text: &str, spec: &ParseSpec) -> Vec<Record> {
        match spec {
            ParseSpec::KeyValue(kv) => keyvalue::parse(text, kv),
            ParseSpec::Table(table) => table::parse(text, table),
        }
    }

    /// Parse raw bytes, decoding invalid UTF-8 lossily.
    pub fn parse_bytes(&self, bytes: &[u8], spec: &ParseSpec) -> Vec<Record> {
        self.parse(&String::from_utf8_lossy(bytes), spec)
    }

    /// Render records back into the layout described by `spec`.
    ///
    /// For key/value specs, parsing the output yields the same records as
    /// long as no key contains the delimiter and every record the spec can
    /// tell apart is given in its own shape: with a marker boundary, a
    /// record leads with its marker field and holds no other marker key.
    pub fn serialize(&self, records: &[Record], spec: &ParseSpec) -> String {
        match spec {
            ParseSpec::KeyValue(kv) => keyvalue::serialize(records, kv),
            ParseSpec::Table(table) => table::serialize(records, table),
        }
    }

    /// Collect every recognisable line into one record, ignoring boundaries.
    ///
    /// Each line is tried as `Label [value]`, then `key: value`, then
    /// `key=value`.
    pub fn get_attribute_map(&self, text: &str) -> Record {
        let candidates = [
            KeyValueDelimiter::Bracket,
            KeyValueDelimiter::Separator(":".to_string()),
            KeyValueDelimiter::Separator("=".to_string()),
        ];

        let mut record = Record::new();
        for line in text.lines() {
            if let Some((key, value)) = candidates
                .iter()
                .find_map(|delimiter| keyvalue::split_pair(line, delimiter))
            {
                record.insert(key, value);
            }
        }
        record
    }

    /// Like [`get_attribute_map`](Self::get_attribute_map) with an explicit
    /// delimiter.
    pub fn get_attribute_map_with(&self, text: &str, spec: &KeyValueSpec) -> Record {
        let mut record = Record::new();
        for line in text.lines() {
            if let Some((key, value)) = keyvalue::split_pair(line, &spec.delimiter) {
                record.insert(key, value);
            }
        }
        record
    }

    /// Value of a `Label   [value]` line: the trimmed text between the first
    /// `[` and the last `]`.
    pub fn get_bracketed_value(line: &str) -> Option<&str> {
        keyvalue::bracketed_value(line)
    }
}
