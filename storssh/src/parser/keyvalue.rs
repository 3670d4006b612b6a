//! Key/value block layout.

use log::trace;

use super::record::Record;
use super::spec::{KeyValueDelimiter, KeyValueSpec};

pub(super) fn parse(text: &str, spec: &KeyValueSpec) -> Vec<Record> {
    let blank_ends = spec.blank_line_ends_record();
    let mut records = Vec::new();
    let mut current = Record::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() {
            if blank_ends {
                flush(&mut records, &mut current);
            }
            continue;
        }

        if spec.is_header(line) {
            flush(&mut records, &mut current);
            continue;
        }

        let Some((key, value)) = split_pair(line, &spec.delimiter) else {
            trace!("parser: dropping line without key/value: {:?}", line);
            continue;
        };

        if spec.is_marker(key) {
            flush(&mut records, &mut current);
        }
        current.insert(key, value);
    }

    flush(&mut records, &mut current);
    records
}

/// The first marker field of each record is written first, so a marker line
/// never splits the record it belongs to. Blank separator lines are only
/// written when blank lines end records.
pub(super) fn serialize(records: &[Record], spec: &KeyValueSpec) -> String {
    let blank_ends = spec.blank_line_ends_record();
    let mut out = String::new();
    for (i, record) in records.iter().enumerate() {
        if i > 0 && blank_ends {
            out.push('\n');
        }
        let lead = record.keys().position(|key| spec.is_marker(key));
        let rest = record
            .iter()
            .enumerate()
            .filter(|(n, _)| Some(*n) != lead)
            .map(|(_, field)| field);
        let fields = lead.and_then(|n| record.iter().nth(n)).into_iter().chain(rest);
        for (key, value) in fields {
            write_field(&mut out, key, value, &spec.delimiter);
        }
    }
    out
}

fn write_field(out: &mut String, key: &str, value: &str, delimiter: &KeyValueDelimiter) {
    out.push_str(key);
    match delimiter {
        KeyValueDelimiter::Separator(sep) => {
            out.push_str(sep);
            out.push_str(value);
        }
        KeyValueDelimiter::Bracket => {
            out.push_str(" [");
            out.push_str(value);
            out.push(']');
        }
        KeyValueDelimiter::Columns => {
            out.push_str("    ");
            out.push_str(value);
        }
    }
    out.push('\n');
}

fn flush(records: &mut Vec<Record>, current: &mut Record) {
    if !current.is_empty() {
        records.push(std::mem::take(current));
    }
}

/// Split one line into a trimmed, non-empty key and a trimmed value.
pub(super) fn split_pair<'a>(
    line: &'a str,
    delimiter: &KeyValueDelimiter,
) -> Option<(&'a str, &'a str)> {
    let (key, value) = match delimiter {
        KeyValueDelimiter::Separator(sep) => line.split_once(sep.as_str())?,
        KeyValueDelimiter::Bracket => {
            let open = line.find('[')?;
            (&line[..open], bracketed_value(line)?)
        }
        KeyValueDelimiter::Columns => split_columns(line.trim_start())?,
    };

    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Text between the first `[` and the last `]`, trimmed.
pub(super) fn bracketed_value(line: &str) -> Option<&str> {
    let open = line.find('[')?;
    let close = line.rfind(']')?;
    if close <= open {
        return None;
    }
    Some(line[open + 1..close].trim())
}

fn split_columns(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let at = bytes.iter().enumerate().position(|(i, &b)| {
        b == b'\t' || (b == b' ' && bytes.get(i + 1) == Some(&b' '))
    })?;
    Some((&line[..at], &line[at..]))
}
