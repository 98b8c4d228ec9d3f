//! CSV file path validation.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{CsvError, PathRejection, Result};

/// Returns `true` if `path` is acceptable as a CSV file.
///
/// The path may not exist yet, but if it does it must be a regular file. The
/// extension must be `csv`, compared case-insensitively.
pub fn is_csv_file(path: &Path) -> bool {
    check(path).is_ok()
}

fn check(path: &Path) -> std::result::Result<(), PathRejection> {
    if path.exists() && !path.is_file() {
        return Err(PathRejection::NotAFile);
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(()),
        _ => Err(PathRejection::Extension),
    }
}

/// A path that passed CSV validation.
///
/// Validation happens once, on construction, before any read or write.
///
/// # Examples
///
/// ```
/// use csv_mapper::CsvPath;
///
/// assert!(CsvPath::new("out/report.CSV").is_ok());
/// assert!(CsvPath::new("out/report.txt").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvPath(PathBuf);

impl CsvPath {
    /// Validates `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match check(&path) {
            Ok(()) => Ok(CsvPath(path)),
            Err(reason) => Err(CsvError::InvalidPath { path, reason }),
        }
    }

    /// Returns the validated path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for CsvPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for CsvPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
