//! # CSV Mapper
//!
//! A lenient CSV codec that converts between CSV text and ordered sequences
//! of string fields, and binds rows to application types.
//!
//! ## Design Principles
//!
//! - **Fixed dialect**: `,` delimiter, `"` quote, quotes escaped by doubling
//! - **Multi-line records**: a quoted field may span physical lines; line
//!   breaks inside it are kept as `\n`
//! - **Lenient parsing**: an unterminated trailing quote is closed, not rejected
//! - **Caller-chosen quoting**: each output row is quoted entirely or not at all
//! - **Explicit charset**: the detected input charset is returned with the rows
//!   and passed back explicitly when writing
//!
//! ## Example
//!
//! ```no_run
//! use csv_mapper::{CsvCodec, CsvPath, QuotePolicy};
//!
//! let codec = CsvCodec::new();
//! let input = codec.read_path(&CsvPath::new("input.csv").unwrap()).unwrap();
//! let rows = input.rows.iter().map(|r| (r, QuotePolicy::All));
//! codec
//!     .write_path(&CsvPath::new("output.csv").unwrap(), rows, Some(input.charset))
//!     .unwrap();
//! ```

pub mod assembler;
pub mod charset;
pub mod codec;
pub mod error;
pub mod mapper;
pub mod path;
pub mod splitter;
pub mod writer;

/// Field delimiter.
pub const DELIMITER: char = ',';

/// Quote character; doubled inside a field to stand for itself.
pub const QUOTE: char = '"';

pub use assembler::RecordAssembler;
pub use charset::{detect, Charset, DecodingReader};
pub use codec::{CsvCodec, ReadOutcome};
pub use error::{CsvError, PathRejection, Result};
pub use mapper::{CsvMappable, Mapped, SkippedRow};
pub use path::{is_csv_file, CsvPath};
pub use splitter::split_record;
pub use writer::{format_record, QuotePolicy, RecordWriter, LINE_TERMINATOR};
