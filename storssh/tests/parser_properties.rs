//! Property tests for the record parser.

use proptest::prelude::*;
use storssh::parser::{Boundary, KeyValueSpec, ParseSpec, Record, RecordParser, TableSpec};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Keys: no delimiter characters, no surrounding whitespace, never empty,
/// single spaces only so column layouts split after the key.
fn key() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9#_.-]{0,7}( [A-Za-z0-9#_.-]{1,7}){0,2}"
}

/// Values: no line breaks or brackets, no surrounding whitespace.
fn value() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[A-Za-z0-9][A-Za-z0-9 :=/._-]{0,20}[A-Za-z0-9]",]
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::vec((key(), value()), 1..6)
        .prop_map(|pairs| pairs.into_iter().collect::<Record>())
}

fn records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(record(), 0..5)
}

/// Records that each open with a `Name` field and carry no other `Name`.
fn named_records() -> impl Strategy<Value = Vec<Record>> {
    let other_key = key().prop_filter("marker key", |k| k != "Name");
    let fields = prop::collection::vec((other_key, value()), 0..5);
    prop::collection::vec((value(), fields), 0..5).prop_map(|records| {
        records
            .into_iter()
            .map(|(name, fields)| {
                std::iter::once(("Name".to_string(), name))
                    .chain(fields)
                    .collect::<Record>()
            })
            .collect()
    })
}

fn key_value_spec() -> impl Strategy<Value = ParseSpec> {
    prop_oneof![
        Just(ParseSpec::from(KeyValueSpec::bracket())),
        Just(ParseSpec::from(KeyValueSpec::separator(" = ").unwrap())),
        Just(ParseSpec::from(KeyValueSpec::separator(" : ").unwrap())),
        Just(ParseSpec::from(KeyValueSpec::columns())),
        Just(ParseSpec::from(
            KeyValueSpec::separator(": ")
                .unwrap()
                .with_boundary(Boundary::header(r"^-{3,}$").unwrap())
        )),
    ]
}

/// Specs whose only record boundary is a `Name` line.
fn marker_spec() -> impl Strategy<Value = ParseSpec> {
    prop_oneof![
        Just(ParseSpec::from(
            KeyValueSpec::separator(" : ")
                .unwrap()
                .with_boundaries(vec![Boundary::Marker("Name".into())])
        )),
        Just(ParseSpec::from(
            KeyValueSpec::columns().with_boundaries(vec![Boundary::Marker("Name".into())])
        )),
        Just(ParseSpec::from(
            KeyValueSpec::bracket().with_boundary(Boundary::Marker("Name".into()))
        )),
    ]
}

fn any_spec() -> impl Strategy<Value = ParseSpec> {
    prop_oneof![
        key_value_spec(),
        marker_spec(),
        Just(ParseSpec::from(TableSpec::delimited(','))),
        Just(ParseSpec::from(TableSpec::whitespace())),
        Just(ParseSpec::from(TableSpec::whitespace().with_header_prefix("ID"))),
    ]
}

proptest! {
    #[test]
    fn key_value_round_trip(records in records(), spec in key_value_spec()) {
        init_logging();
        let parser = RecordParser::new();
        let text = parser.serialize(&records, &spec);
        prop_assert_eq!(parser.parse(&text, &spec), records);
    }

    #[test]
    fn marker_records_round_trip(records in named_records(), spec in marker_spec()) {
        let parser = RecordParser::new();
        let text = parser.serialize(&records, &spec);
        prop_assert_eq!(parser.parse(&text, &spec), records);
    }

    #[test]
    fn parsing_is_idempotent(text in "(?s).{0,400}", spec in any_spec()) {
        let parser = RecordParser::new();
        let first = parser.parse(&text, &spec);
        let second = parser.parse(&text, &spec);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512), spec in any_spec()) {
        let parser = RecordParser::new();
        let records = parser.parse_bytes(&bytes, &spec);
        for record in &records {
            prop_assert!(!record.is_empty());
        }
        let _ = parser.get_attribute_map(&String::from_utf8_lossy(&bytes));
    }

    #[test]
    fn table_rows_match_header_width(rows in prop::collection::vec(prop::collection::vec("[a-z0-9]{1,6}", 1..5), 1..10)) {
        let text = rows.iter().map(|r| r.join(",")).collect::<Vec<_>>().join("\n");
        let records = RecordParser::new().parse(&text, &TableSpec::delimited(',').into());
        let width = rows[0].len();
        let expected = rows[1..].iter().filter(|r| r.len() == width).count();
        prop_assert_eq!(records.len(), expected);
        for record in &records {
            prop_assert_eq!(record.len(), width);
        }
    }
}

#[test]
fn empty_input_yields_no_records() {
    init_logging();
    let parser = RecordParser::new();
    assert!(parser.parse("", &KeyValueSpec::bracket().into()).is_empty());
    assert!(parser.parse("", &TableSpec::delimited(',').into()).is_empty());
}
