//! Record serialization.

use log::{trace, warn};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::charset::Charset;
use crate::{DELIMITER, QUOTE};

/// Line terminator appended after every written record.
pub const LINE_TERMINATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Per-row quoting decision, supplied by the caller.
///
/// The writer never inspects field content to decide on quoting. Rows that
/// may hold delimiters or line breaks must be written with `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotePolicy {
    /// Wrap every field in quotes.
    #[default]
    All,
    /// Wrap no field, whatever it contains.
    Never,
}

impl QuotePolicy {
    /// Maps a row's "may contain line breaks" flag to a policy.
    pub fn from_include_lines(include_lines: bool) -> Self {
        if include_lines {
            QuotePolicy::All
        } else {
            QuotePolicy::Never
        }
    }
}

/// Serializes one record without a line terminator.
///
/// Every quote in a field is doubled. Under [`QuotePolicy::All`] each field
/// is then wrapped in quotes, even when it needs none.
///
/// # Examples
///
/// ```
/// use csv_mapper::{format_record, QuotePolicy};
///
/// assert_eq!(format_record(["a\"b", "c"], QuotePolicy::All), "\"a\"\"b\",\"c\"");
/// assert_eq!(format_record(["a\"b", "c"], QuotePolicy::Never), "a\"\"b,c");
/// ```
pub fn format_record<I, S>(fields: I, policy: QuotePolicy) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            line.push(DELIMITER);
        }
        let escaped = field.as_ref().replace(QUOTE, "\"\"");
        match policy {
            QuotePolicy::All => {
                line.push(QUOTE);
                line.push_str(&escaped);
                line.push(QUOTE);
            }
            QuotePolicy::Never => line.push_str(&escaped),
        }
    }
    line
}

/// Writes records as encoded lines to an output stream.
pub struct RecordWriter<W: Write> {
    inner: W,
    charset: Charset,
    rows: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Creates a writer emitting text in `charset`.
    ///
    /// A charset `encoding_rs` cannot produce, such as UTF-16, is written as
    /// [`Charset::output`] instead, with a warning.
    pub fn new(inner: W, charset: Charset) -> Self {
        let output = charset.output();
        if output != charset {
            warn!("Cannot write {}, writing {} instead", charset, output);
        }
        RecordWriter {
            inner,
            charset: output,
            rows: 0,
        }
    }

    /// Returns the charset records are encoded in.
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Writes one record followed by [`LINE_TERMINATOR`].
    pub fn write_record<I, S>(&mut self, fields: I, policy: QuotePolicy) -> io::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = format_record(fields, policy);
        line.push_str(LINE_TERMINATOR);
        self.inner.write_all(&self.charset.encode(&line)?)?;
        self.rows += 1;
        trace!("Wrote record {} ({} bytes)", self.rows, line.len());
        Ok(())
    }

    /// Returns the number of records written so far.
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}
