//! Delimited table layout.

use log::trace;

use super::record::Record;
use super::spec::{ColumnDelimiter, HeaderRule, TableSpec};

pub(super) fn parse(text: &str, spec: &TableSpec) -> Vec<Record> {
    let mut header: Option<Vec<&str>> = None;
    let mut records = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if spec.skip_separators && is_separator(line) {
            continue;
        }

        let is_header = match spec.header {
            HeaderRule::FirstLine => header.is_none(),
            HeaderRule::Prefix(ref prefix) => line.trim_start().starts_with(prefix.as_str()),
            HeaderRule::Pattern(ref re) => re.is_match(line),
        };
        if is_header {
            header = Some(split_cells(line, spec.delimiter));
            continue;
        }

        let Some(ref names) = header else {
            trace!("parser: dropping line before table header: {:?}", line);
            continue;
        };

        let cells = split_cells(line, spec.delimiter);
        if cells.len() != names.len() {
            trace!(
                "parser: skipping row with {} fields (header has {}): {:?}",
                cells.len(),
                names.len(),
                line
            );
            continue;
        }

        records.push(names.iter().copied().zip(cells).collect());
    }

    records
}

pub(super) fn serialize(records: &[Record], spec: &TableSpec) -> String {
    let joiner = match spec.delimiter {
        ColumnDelimiter::Char(c) => c.to_string(),
        ColumnDelimiter::Whitespace => "  ".to_string(),
    };

    let Some(first) = records.first() else {
        return String::new();
    };

    let mut out = first.keys().collect::<Vec<_>>().join(joiner.as_str());
    out.push('\n');
    for record in records {
        out.push_str(&record.iter().map(|(_, v)| v).collect::<Vec<_>>().join(joiner.as_str()));
        out.push('\n');
    }
    out
}

fn split_cells(line: &str, delimiter: ColumnDelimiter) -> Vec<&str> {
    match delimiter {
        ColumnDelimiter::Char(c) => line.split(c).map(str::trim).collect(),
        ColumnDelimiter::Whitespace => line.split_whitespace().collect(),
    }
}

fn is_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains(['-', '=']) && trimmed.chars().all(|c| matches!(c, '-' | '=' | '+' | '|' | ' '))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimited_table_skips_short_row() {
        let text = "id,name,total\n1,pool-a,100\n2,pool-b,200\n3,pool-c\n";
        let records = parse(text, &TableSpec::delimited(','));
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![("id", "1"), ("name", "pool-a"), ("total", "100")]
        );
        assert_eq!(records[1].get("name"), Some("pool-b"));
    }

    #[test]
    fn test_whitespace_table_with_separator_line() {
        let text = "\
Disk   Status   Size
-----  -------  ----
0      Online   600G
1      Broken   600G
";
        let records = parse(text, &TableSpec::whitespace());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Status"), Some("Broken"));
    }

    #[test]
    fn test_header_rematch_starts_new_table() {
        let text = "\
CLI> show pools
ID  Name
0   pool-a
ID  Name  Tier
1   pool-b  ssd
";
        let spec = TableSpec::whitespace().with_header_prefix("ID");
        let records = parse(text, &spec);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Tier"), None);
        assert_eq!(records[1].get("Tier"), Some("ssd"));
    }

    #[test]
    fn test_duplicate_header_names() {
        let records = parse("port,port\nA,B\n", &TableSpec::delimited(','));
        assert_eq!(records[0].get("port"), Some("A"));
        assert_eq!(records[0].get("port1"), Some("B"));
    }

    #[test]
    fn test_no_header_no_records() {
        assert!(parse("", &TableSpec::delimited(',')).is_empty());
        let spec = TableSpec::delimited(',').with_header_prefix("id");
        assert!(parse("1,2,3\n", &spec).is_empty());
    }
}
