//! Field splitting for one logical record.
//!
//! The record is first split on every delimiter without regard to quoting,
//! then a repair pass walks the chunks, rejoining chunks that belong to one
//! quoted field and collapsing doubled quotes.

use crate::{DELIMITER, QUOTE};

/// Splits a logical record into unescaped field values.
///
/// Never fails. A record with an unbalanced quote keeps its trailing content
/// literally in the last field. An empty record yields a single empty field.
///
/// # Examples
///
/// ```
/// use csv_mapper::split_record;
///
/// assert_eq!(
///     split_record("2-1,\"2-2a,2-2b\",2-3,2-4"),
///     vec!["2-1", "2-2a,2-2b", "2-3", "2-4"]
/// );
/// assert_eq!(split_record("\"a\"\"b\""), vec!["a\"b"]);
/// ```
pub fn split_record(record: &str) -> Vec<String> {
    let chunks: Vec<&str> = record.split(DELIMITER).collect();
    let mut fields = Vec::with_capacity(chunks.len());
    let mut index = 0;

    while index < chunks.len() {
        let chunk = chunks[index];
        match chunk.find(QUOTE) {
            None => fields.push(chunk.to_string()),
            Some(first_quote) => {
                let (field, last) = repair_quoted(&chunks, index, first_quote);
                fields.push(field);
                index = last;
            }
        }
        index += 1;
    }

    fields
}

/// Rebuilds one field starting at `chunks[start]`, whose first quote sits at
/// byte offset `first_quote`.
///
/// Returns the field and the index of the last chunk it consumed.
fn repair_quoted(chunks: &[&str], start: usize, first_quote: usize) -> (String, usize) {
    let mut index = start;
    let mut chunk = chunks[index];
    let mut field = String::with_capacity(chunk.len());

    // A leading quote opens the span and is not part of the value.
    let mut in_quote = first_quote == 0;
    let mut escaped = false;
    let mut pos = if in_quote { 1 } else { 0 };

    // An open span keeps consuming chunks even when one is empty or ends
    // right after a quote.
    loop {
        match chunk[pos..].find(QUOTE) {
            Some(offset) => {
                let quote_at = pos + offset;
                if offset > 0 {
                    field.push_str(&chunk[pos..quote_at]);
                } else if escaped {
                    // Second quote of a doubled pair.
                    field.push(QUOTE);
                }
                escaped = !escaped;
                in_quote = !in_quote;
                pos = quote_at + 1;
            }
            None => {
                field.push_str(&chunk[pos..]);
                if in_quote && index + 1 < chunks.len() {
                    // The naive split cut inside the quoted span.
                    index += 1;
                    chunk = chunks[index];
                    field.push(DELIMITER);
                    pos = 0;
                } else {
                    break;
                }
            }
        }
    }

    (field, index)
}
