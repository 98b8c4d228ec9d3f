//! Logical record assembly.
//!
//! A quoted field may contain raw line breaks, so one logical record can span
//! several physical lines. The assembler tracks quote parity across lines and
//! joins them with `\n` until the quoted span closes.

use log::{debug, warn};
use std::io::{self, BufRead};

use crate::QUOTE;

/// Joins physical lines into logical records.
///
/// Wraps any source of lines (typically [`BufRead::lines`], which strips both
/// `\n` and `\r\n`) and yields one string per logical record. The assembler is
/// consumed once; it cannot be restarted.
///
/// # Healing
///
/// If the input ends while a quoted span is still open, a closing quote is
/// appended and the buffered text is emitted as the final record instead of
/// failing.
///
/// # Example
///
/// ```
/// use csv_mapper::RecordAssembler;
///
/// let lines = ["a,\"b", "c\",d", "e,f"].map(|l| Ok::<_, std::io::Error>(l.to_string()));
/// let records: Vec<String> = RecordAssembler::new(lines.into_iter())
///     .collect::<std::io::Result<_>>()
///     .unwrap();
/// assert_eq!(records, vec!["a,\"b\nc\",d", "e,f"]);
/// ```
pub struct RecordAssembler<I> {
    lines: I,

    /// Records closed by the end-of-input healing rule.
    healed: usize,
}

impl<I> RecordAssembler<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    /// Creates an assembler over a line source.
    pub fn new(lines: I) -> Self {
        RecordAssembler { lines, healed: 0 }
    }

    /// Returns how many records were closed by a synthetic quote.
    pub fn healed_records(&self) -> usize {
        self.healed
    }

    /// Continues a record whose first line opened a quoted span.
    ///
    /// `first` is the opening line and `first_quote` the byte offset of its
    /// first quote, which is counted as the opening toggle.
    fn assemble(&mut self, first: String, first_quote: usize) -> io::Result<String> {
        let mut in_quote = toggle_quotes(true, &first[first_quote + 1..]);
        if !in_quote {
            return Ok(first);
        }

        let mut buffer = first;
        loop {
            match self.lines.next() {
                Some(line) => {
                    let line = line?;
                    buffer.push('\n');
                    in_quote = toggle_quotes(in_quote, &line);
                    buffer.push_str(&line);
                    if !in_quote {
                        return Ok(buffer);
                    }
                }
                None => {
                    self.healed += 1;
                    warn!("Input ended inside a quoted field, closing it");
                    buffer.push(QUOTE);
                    return Ok(buffer);
                }
            }
        }
    }
}

impl<R: BufRead> RecordAssembler<io::Lines<R>> {
    /// Creates an assembler reading lines from a buffered reader.
    pub fn from_reader(reader: R) -> Self {
        RecordAssembler::new(reader.lines())
    }
}

impl<I> Iterator for RecordAssembler<I>
where
    I: Iterator<Item = io::Result<String>>,
{
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e)),
        };

        match line.find(QUOTE) {
            // Common case: no quote, the line is the record.
            None => Some(Ok(line)),
            Some(pos) => {
                let record = self.assemble(line, pos);
                if let Ok(record) = &record {
                    if record.contains('\n') {
                        debug!("Assembled multi-line record of {} bytes", record.len());
                    }
                }
                Some(record)
            }
        }
    }
}

/// Flips `in_quote` once per quote character in `text`.
fn toggle_quotes(in_quote: bool, text: &str) -> bool {
    let count = text.bytes().filter(|&b| b == QUOTE as u8).count();
    in_quote ^ (count % 2 == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn assemble(text: &str) -> Vec<String> {
        RecordAssembler::from_reader(Cursor::new(text))
            .collect::<io::Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_plain_lines_pass_through() {
        assert_eq!(assemble("a,b\nc,d\n"), vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_balanced_quotes_stay_on_one_line() {
        assert_eq!(
            assemble("2-1,\"2-2a,2-2b\",2-3\n"),
            vec!["2-1,\"2-2a,2-2b\",2-3"]
        );
    }

    #[test]
    fn test_quoted_newline_joins_three_lines() {
        let records = assemble("x,\"line1\nline2\nline3\",y\nnext\n");
        assert_eq!(records, vec!["x,\"line1\nline2\nline3\",y", "next"]);
    }

    #[test]
    fn test_crlf_input_is_normalized() {
        let records = assemble("\"a\r\nb\",c\r\nd\r\n");
        assert_eq!(records, vec!["\"a\nb\",c", "d"]);
    }

    #[test]
    fn test_escaped_quotes_do_not_open_a_span() {
        assert_eq!(assemble("\"a\"\"b\",c\nd\n"), vec!["\"a\"\"b\",c", "d"]);
    }

    #[test]
    fn test_empty_line_yields_empty_record() {
        assert_eq!(assemble("a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_unclosed_quote_is_healed_at_end() {
        let mut assembler = RecordAssembler::from_reader(Cursor::new("a,\"b,c"));
        assert_eq!(assembler.next().unwrap().unwrap(), "a,\"b,c\"");
        assert!(assembler.next().is_none());
        assert_eq!(assembler.healed_records(), 1);
    }

    #[test]
    fn test_unclosed_quote_swallows_following_lines() {
        assert_eq!(assemble("a,\"b\nc,d\n"), vec!["a,\"b\nc,d\""]);
    }

    #[test]
    fn test_io_error_is_passed_through() {
        let lines = vec![
            Ok("a".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad bytes")),
        ];
        let mut assembler = RecordAssembler::new(lines.into_iter());
        assert_eq!(assembler.next().unwrap().unwrap(), "a");
        assert!(assembler.next().unwrap().is_err());
        assert!(assembler.next().is_none());
    }
}
