//! Spreadsheet reading.
//!
//! Workbooks (xlsx, xls, ods) go through calamine, CSV through the csv crate.
//! Both end up as a [`Sheet`]: a grid of JSON cell values anchored at an
//! absolute origin, so A1 ranges address the same cells in every format.

pub mod grid;
pub mod range;
pub mod reader;

pub use grid::{header_names, to_records, Block, Sheet};
pub use range::CellRange;
pub use reader::{list_sheets, load_sheet, SheetSummary, WorkbookSummary};

use crate::error::{ServerError, ServerResult};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Ods,
    Csv,
}

impl SpreadsheetFormat {
    /// Detect the format from a file extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "ods" => Some(Self::Ods),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Ods => "ods",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `path` is an existing file with a supported extension.
///
/// Existence is checked first, so a missing `.txt` file reports
/// `FileNotFound` rather than `UnsupportedFormat`.
pub fn validate_path(path: &str) -> ServerResult<(PathBuf, SpreadsheetFormat)> {
    let file = Path::new(path);
    if !file.is_file() {
        return Err(ServerError::file_not_found(path));
    }

    let extension = file
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    match SpreadsheetFormat::from_extension(&extension) {
        Some(format) => Ok((file.to_path_buf(), format)),
        None if extension.is_empty() => Err(ServerError::unsupported_format("(none)")),
        None => Err(ServerError::unsupported_format(format!(".{}", extension))),
    }
}
