//! Binding rows to application types.
//!
//! A bindable type declares its column count and converts itself to and from
//! an ordered field list. Column positions are fixed by the implementation,
//! so no runtime introspection is involved.

use log::{error, warn};
use serde::Serialize;

use crate::charset::Charset;
use crate::error::Result;
use crate::writer::QuotePolicy;

/// A type that can be exported to and imported from one CSV row.
///
/// # Example
///
/// ```
/// use csv_mapper::{CsvError, CsvMappable};
///
/// struct Entry {
///     key: String,
///     note: String,
/// }
///
/// impl CsvMappable for Entry {
///     const COLUMNS: usize = 2;
///
///     fn include_lines(&self) -> bool {
///         true
///     }
///
///     fn to_fields(&self) -> Vec<String> {
///         vec![self.key.clone(), self.note.clone()]
///     }
///
///     fn from_fields(fields: &[String]) -> Result<Self, CsvError> {
///         Ok(Entry {
///             key: fields[0].clone(),
///             note: fields[1].clone(),
///         })
///     }
/// }
/// ```
pub trait CsvMappable: Sized {
    /// Number of leading fields the type reads. Shorter rows are skipped
    /// before [`CsvMappable::from_fields`] is called.
    const COLUMNS: usize;

    /// Whether this row may contain line breaks; such rows are written with
    /// every field quoted.
    fn include_lines(&self) -> bool;

    /// Exports the row as ordered fields.
    fn to_fields(&self) -> Vec<String>;

    /// Imports a row. `fields` holds at least [`CsvMappable::COLUMNS`] values.
    ///
    /// Return [`CsvError::RowBinding`](crate::CsvError::RowBinding) to skip
    /// just this row; any other error aborts the conversion.
    fn from_fields(fields: &[String]) -> Result<Self>;

    /// Quoting used when writing this row.
    fn quote_policy(&self) -> QuotePolicy {
        QuotePolicy::from_include_lines(self.include_lines())
    }
}

/// A row left out of a bound result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// Zero-based position of the row in the file.
    pub row: usize,

    /// The fields as parsed.
    pub fields: Vec<String>,

    /// Why the row was skipped.
    pub reason: String,
}

/// Rows bound to `T`, with the rows that could not be bound.
#[derive(Debug)]
pub struct Mapped<T> {
    /// Successfully bound rows, in file order.
    pub items: Vec<T>,

    /// Rows skipped during binding.
    pub skipped: Vec<SkippedRow>,

    /// Charset the input was decoded with.
    pub charset: Charset,
}

/// Binds parsed rows to `T`.
///
/// Short rows and rows failing with a row-local error are recorded in
/// `skipped`; any other error is returned.
pub(crate) fn bind_rows<T: CsvMappable>(
    rows: Vec<Vec<String>>,
    charset: Charset,
) -> Result<Mapped<T>> {
    let mut items = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();

    for (row, fields) in rows.into_iter().enumerate() {
        if fields.len() < T::COLUMNS {
            error!("invalid row: {:?}", fields);
            skipped.push(SkippedRow {
                row,
                reason: format!("expected {} fields, got {}", T::COLUMNS, fields.len()),
                fields,
            });
            continue;
        }

        match T::from_fields(&fields) {
            Ok(item) => items.push(item),
            Err(e) if e.is_row_local() => {
                warn!("skip row {}: {}", row, e);
                skipped.push(SkippedRow {
                    row,
                    fields,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Mapped {
        items,
        skipped,
        charset,
    })
}
