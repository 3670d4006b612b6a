//! Parse specifications: how raw text is segmented into records.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::error::ParseError;

/// Configuration telling [`RecordParser`](super::RecordParser) how to read
/// one kind of output.
#[derive(Debug, Clone)]
pub enum ParseSpec {
    /// `key<delimiter>value` lines grouped into blocks.
    KeyValue(KeyValueSpec),

    /// A header line followed by delimited rows.
    Table(TableSpec),
}

impl ParseSpec {
    /// Build a spec from externally supplied names, e.g. a driver's command
    /// catalog.
    ///
    /// `delimiter` is the key/value separator for [`LayoutKind::KeyValue`],
    /// the column delimiter for [`LayoutKind::Table`] (whitespace means
    /// "runs of whitespace"), and ignored for [`LayoutKind::Bracket`].
    pub fn from_kind(kind: LayoutKind, delimiter: &str) -> Result<Self, ParseError> {
        match kind {
            LayoutKind::KeyValue => Ok(KeyValueSpec::separator(delimiter)?.into()),
            LayoutKind::Bracket => Ok(KeyValueSpec::bracket().into()),
            LayoutKind::Table => {
                if delimiter.is_empty() {
                    return Err(ParseError::EmptyDelimiter);
                }
                let mut chars = delimiter.chars();
                match (chars.next(), chars.next()) {
                    _ if delimiter.trim().is_empty() => Ok(TableSpec::whitespace().into()),
                    (Some(c), None) => Ok(TableSpec::delimited(c).into()),
                    _ => Err(ParseError::UnknownLayout(format!(
                        "table delimiter must be one character, got '{delimiter}'"
                    ))),
                }
            }
        }
    }

    /// The layout this spec describes.
    pub fn kind(&self) -> LayoutKind {
        match self {
            ParseSpec::KeyValue(spec) if spec.delimiter == KeyValueDelimiter::Bracket => {
                LayoutKind::Bracket
            }
            ParseSpec::KeyValue(_) => LayoutKind::KeyValue,
            ParseSpec::Table(_) => LayoutKind::Table,
        }
    }
}

impl From<KeyValueSpec> for ParseSpec {
    fn from(spec: KeyValueSpec) -> Self {
        ParseSpec::KeyValue(spec)
    }
}

impl From<TableSpec> for ParseSpec {
    fn from(spec: TableSpec) -> Self {
        ParseSpec::Table(spec)
    }
}

/// Layout names accepted from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    KeyValue,
    Bracket,
    Table,
}

impl FromStr for LayoutKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keyvalue" | "key_value" | "kv" => Ok(LayoutKind::KeyValue),
            "bracket" => Ok(LayoutKind::Bracket),
            "table" => Ok(LayoutKind::Table),
            _ => Err(ParseError::UnknownLayout(s.to_string())),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::KeyValue => "keyvalue",
            LayoutKind::Bracket => "bracket",
            LayoutKind::Table => "table",
        })
    }
}

/// How a key is separated from its value on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValueDelimiter {
    /// Split on the first occurrence of this string.
    Separator(String),

    /// `Label   [value]`.
    Bracket,

    /// Key and value separated by a tab or two or more spaces.
    Columns,
}

/// What ends one record and starts the next in a key/value block.
#[derive(Debug, Clone)]
pub enum Boundary {
    /// A blank line ends the record. Without this boundary blank lines are
    /// skipped.
    BlankLine,

    /// A line with this key starts a new record.
    Marker(String),

    /// A line matching this pattern ends the record and carries no field.
    Header(Regex),
}

impl Boundary {
    /// Header boundary from a pattern string.
    pub fn header(pattern: &str) -> Result<Self, ParseError> {
        Ok(Boundary::Header(Regex::new(pattern)?))
    }
}

/// Key/value block layout.
#[derive(Debug, Clone)]
pub struct KeyValueSpec {
    pub delimiter: KeyValueDelimiter,
    pub boundaries: Vec<Boundary>,
}

impl KeyValueSpec {
    /// `key<separator>value` lines, records separated by blank lines.
    pub fn separator(separator: impl Into<String>) -> Result<Self, ParseError> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(ParseError::EmptyDelimiter);
        }
        Ok(Self::with_delimiter(KeyValueDelimiter::Separator(separator)))
    }

    /// `Label [value]` lines, records separated by blank lines.
    pub fn bracket() -> Self {
        Self::with_delimiter(KeyValueDelimiter::Bracket)
    }

    /// `Label    value` lines, records separated by blank lines.
    pub fn columns() -> Self {
        Self::with_delimiter(KeyValueDelimiter::Columns)
    }

    fn with_delimiter(delimiter: KeyValueDelimiter) -> Self {
        Self {
            delimiter,
            boundaries: vec![Boundary::BlankLine],
        }
    }

    /// Add a boundary rule.
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    /// Replace all boundary rules.
    pub fn with_boundaries(mut self, boundaries: Vec<Boundary>) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub(super) fn blank_line_ends_record(&self) -> bool {
        self.boundaries
            .iter()
            .any(|b| matches!(b, Boundary::BlankLine))
    }

    pub(super) fn is_header(&self, line: &str) -> bool {
        self.boundaries
            .iter()
            .any(|b| matches!(b, Boundary::Header(re) if re.is_match(line)))
    }

    pub(super) fn is_marker(&self, key: &str) -> bool {
        self.boundaries
            .iter()
            .any(|b| matches!(b, Boundary::Marker(m) if m == key))
    }
}

/// How table cells are separated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDelimiter {
    Char(char),
    Whitespace,
}

/// Which line is the table header.
#[derive(Debug, Clone)]
pub enum HeaderRule {
    /// The first non-blank line.
    FirstLine,

    /// A line starting with this text (after leading whitespace). Every
    /// matching line starts a new table.
    Prefix(String),

    /// A line matching this pattern. Every matching line starts a new table.
    Pattern(Regex),
}

/// Delimited table layout.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub delimiter: ColumnDelimiter,
    pub header: HeaderRule,

    /// Skip lines made only of `-`, `=`, `+`, `|` and spaces.
    pub skip_separators: bool,
}

impl TableSpec {
    /// Cells separated by a single character.
    pub fn delimited(delimiter: char) -> Self {
        Self {
            delimiter: ColumnDelimiter::Char(delimiter),
            header: HeaderRule::FirstLine,
            skip_separators: true,
        }
    }

    /// Cells separated by runs of whitespace.
    pub fn whitespace() -> Self {
        Self {
            delimiter: ColumnDelimiter::Whitespace,
            header: HeaderRule::FirstLine,
            skip_separators: true,
        }
    }

    /// Header is a line starting with `prefix`.
    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.header = HeaderRule::Prefix(prefix.into());
        self
    }

    /// Header is a line matching `pattern`.
    pub fn with_header_pattern(mut self, pattern: &str) -> Result<Self, ParseError> {
        self.header = HeaderRule::Pattern(Regex::new(pattern)?);
        Ok(self)
    }

    /// Treat separator lines as data rows.
    pub fn keep_separators(mut self) -> Self {
        self.skip_separators = false;
        self
    }
}
