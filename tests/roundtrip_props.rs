//! Property-based tests for the write-then-read round trip.

use csv_mapper::{format_record, Charset, CsvCodec, QuotePolicy};
use proptest::prelude::*;

/// Field content built from the characters that matter to the dialect.
fn tricky_field_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9 ]{0,12}",
        "[a-z,\"\n]{0,12}",
        "[\",]{1,6}",
        Just(String::new()),
        Just("\"".to_string()),
        Just("line1\nline2\nline3".to_string()),
        Just("東京,\"大阪\"".to_string()),
    ]
}

/// Fields safe to write without quotes: no delimiter, no line break and no
/// leading quote.
fn bare_field_strategy() -> impl Strategy<Value = String> {
    "([a-z0-9 ][a-z0-9 \"]{0,10})?"
}

fn rows_strategy(field: impl Strategy<Value = String>) -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec(field, 1..6), 0..8)
}

fn write_then_read(rows: &[Vec<String>], policy: QuotePolicy) -> Vec<Vec<String>> {
    let codec = CsvCodec::new();
    let mut out = Vec::new();
    codec
        .write_rows(&mut out, rows.iter().map(|r| (r, policy)), Charset::utf8())
        .unwrap();
    codec.read_rows(out.as_slice()).unwrap()
}

proptest! {
    #[test]
    fn prop_quote_all_round_trips(rows in rows_strategy(tricky_field_strategy())) {
        prop_assert_eq!(write_then_read(&rows, QuotePolicy::All), rows);
    }

    #[test]
    fn prop_never_round_trips_bare_fields(rows in rows_strategy(bare_field_strategy())) {
        prop_assert_eq!(write_then_read(&rows, QuotePolicy::Never), rows);
    }

    /// Quote-all output is standard CSV: an independent reader agrees.
    #[test]
    fn prop_quote_all_output_is_standard_csv(
        fields in prop::collection::vec(tricky_field_strategy(), 1..6)
    ) {
        let line = format_record(&fields, QuotePolicy::All);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(line.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        let parsed: Vec<String> = record.iter().map(str::to_string).collect();
        prop_assert_eq!(parsed, fields);
    }

    #[test]
    fn prop_split_never_panics(record in "[a-z,\"\n ]{0,40}") {
        let fields = csv_mapper::split_record(&record);
        prop_assert!(!fields.is_empty());
    }
}
