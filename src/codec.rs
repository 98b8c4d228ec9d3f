//! Read and write paths tying the assembler, splitter and writer together.
//!
//! Reading streams the input: bytes are decoded, assembled into logical
//! records and split into fields one record at a time. Writing encodes and
//! emits one record at a time.

use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Cursor, Read, Write};

use crate::assembler::RecordAssembler;
use crate::charset::{self, Charset, DecodingReader, SNIFF_LEN};
use crate::error::Result;
use crate::mapper::{self, CsvMappable, Mapped};
use crate::path::CsvPath;
use crate::splitter::split_record;
use crate::writer::{QuotePolicy, RecordWriter};

/// Rows read from a file and the charset they were decoded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Field sequences in file order; rows may differ in length.
    pub rows: Vec<Vec<String>>,

    /// Charset used to decode the input.
    pub charset: Charset,
}

/// The CSV codec.
///
/// The dialect is fixed: `,` delimiter, `"` quote, quotes escaped by doubling.
///
/// # Example
///
/// ```
/// use csv_mapper::{CsvCodec, QuotePolicy};
///
/// let codec = CsvCodec::new();
/// let rows = codec.parse_str("1-1,1-2\n2-1,\"2-2a,2-2b\"\n");
/// assert_eq!(rows[1], vec!["2-1", "2-2a,2-2b"]);
///
/// let mut out = Vec::new();
/// let written = codec
///     .write_rows(&mut out, rows.iter().map(|r| (r, QuotePolicy::All)), Default::default())
///     .unwrap();
/// assert_eq!(written, 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvCodec {
    /// Overrides charset detection on read and is the default on write.
    charset: Option<Charset>,

    /// Drop records that are a single empty field.
    skip_blank: bool,
}

impl CsvCodec {
    /// Creates a codec that detects the input charset and keeps blank rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forces the charset used to read files, skipping detection. It is also
    /// the write charset when a write call passes none.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Drops empty lines from read results instead of returning `[""]`.
    pub fn skip_blank_records(mut self, skip: bool) -> Self {
        self.skip_blank = skip;
        self
    }

    /// Parses already-decoded text from a buffered reader.
    pub fn read_rows<R: BufRead>(&self, reader: R) -> Result<Vec<Vec<String>>> {
        let mut assembler = RecordAssembler::from_reader(reader);
        let mut rows = Vec::new();

        for record in assembler.by_ref() {
            let record = record?;
            if self.skip_blank && record.is_empty() {
                continue;
            }
            rows.push(split_record(&record));
        }

        if assembler.healed_records() > 0 {
            warn!("Closed {} unterminated quoted field(s)", assembler.healed_records());
        }
        debug!("Parsed {} rows", rows.len());
        Ok(rows)
    }

    /// Parses in-memory text.
    pub fn parse_str(&self, text: &str) -> Vec<Vec<String>> {
        // Reading from a byte slice cannot fail.
        self.read_rows(text.as_bytes()).unwrap_or_default()
    }

    /// Decodes and parses raw bytes from any reader.
    ///
    /// The charset is the configured one, else detected from the first
    /// [`SNIFF_LEN`] bytes, else UTF-8.
    pub fn read_from<R: Read>(&self, mut reader: R) -> Result<ReadOutcome> {
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;

        let charset = match self.charset {
            Some(charset) => charset,
            None => charset::detect(&prefix).unwrap_or_else(|| {
                warn!("Could not detect charset, falling back to UTF-8");
                Charset::utf8()
            }),
        };
        debug!("Reading as {}", charset);

        let decoded = DecodingReader::new(Cursor::new(prefix).chain(reader), charset);
        let rows = self.read_rows(BufReader::new(decoded))?;
        Ok(ReadOutcome { rows, charset })
    }

    /// Reads a CSV file.
    pub fn read_path(&self, path: &CsvPath) -> Result<ReadOutcome> {
        let file = File::open(path)?;
        let outcome = self.read_from(file)?;
        info!(
            "Read {} rows from {} ({})",
            outcome.rows.len(),
            path,
            outcome.charset
        );
        Ok(outcome)
    }

    /// Writes rows, each paired with its quoting policy, and flushes.
    ///
    /// Returns the number of rows written.
    pub fn write_rows<W, I, R, S>(&self, writer: W, rows: I, charset: Charset) -> Result<usize>
    where
        W: Write,
        I: IntoIterator<Item = (R, QuotePolicy)>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = RecordWriter::new(writer, charset);
        for (fields, policy) in rows {
            out.write_record(fields, policy)?;
        }
        let count = out.rows_written();
        out.finish()?;
        Ok(count)
    }

    /// Writes rows to a file, creating missing parent directories.
    ///
    /// `charset` defaults to the configured charset, then UTF-8. A charset
    /// that cannot be written, such as UTF-16, falls back to
    /// [`Charset::output`]. When `rows` is empty nothing is created and
    /// `Ok(false)` is returned.
    pub fn write_path<I, R, S>(
        &self,
        path: &CsvPath,
        rows: I,
        charset: Option<Charset>,
    ) -> Result<bool>
    where
        I: IntoIterator<Item = (R, QuotePolicy)>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rows = rows.into_iter().peekable();
        if rows.peek().is_none() {
            debug!("Nothing to write to {}", path);
            return Ok(false);
        }

        if let Some(parent) = path.as_path().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let charset = charset.or(self.charset).unwrap_or_default();
        let file = File::create(path)?;
        let count = self.write_rows(BufWriter::new(file), rows, charset)?;
        info!("output to {} ({} rows, {})", path, count, charset.output());
        Ok(true)
    }

    /// Reads a file and binds each row to `T`.
    pub fn read_mapped<T: CsvMappable>(&self, path: &CsvPath) -> Result<Mapped<T>> {
        let ReadOutcome { rows, charset } = self.read_path(path)?;
        mapper::bind_rows(rows, charset)
    }

    /// Exports `items` to a file, one row each, quoted per
    /// [`CsvMappable::include_lines`].
    pub fn write_mapped<T: CsvMappable>(
        &self,
        path: &CsvPath,
        items: &[T],
        charset: Option<Charset>,
    ) -> Result<bool> {
        let rows = items.iter().map(|item| (item.to_fields(), item.quote_policy()));
        self.write_path(path, rows, charset)
    }
}
