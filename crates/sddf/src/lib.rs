//! # sddf
//!
//! Tools for the spreadsheet that feeds a data-driven login test suite.
//!
//! The workbook (`TestData.xlsx` by default) holds one test case per row
//! under a fixed seven-column header. This crate offers three operations on
//! its active sheet:
//!
//! - [`inspect_headers`] prints row 1
//! - [`dump_rows`] prints every row as a tuple
//! - [`fix_headers`] rewrites row 1 to the SDDF layout in place
//!
//! Each operation writes its report to any [`std::io::Write`], so the CLI
//! passes stdout and tests pass a `Vec<u8>`.
//!
//! ## Example
//!
//! ```rust
//! use sddf::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! for (col, label) in SddfHeader::labels().iter().enumerate() {
//!     sheet.set_cell_value_at(0, col as u16, *label).unwrap();
//! }
//!
//! assert!(SddfHeader::matches(&sheet.header_values().values));
//!
//! // workbook.save("TestData.xlsx").unwrap();
//! ```

pub mod dump;
pub mod fix;
pub mod inspect;
pub mod prelude;

pub use dump::{dump_rows, CONTENT_END, CONTENT_START};
pub use fix::fix_headers;
pub use inspect::inspect_headers;

// Re-export core types
pub use sddf_core::{
    CellAddress, CellError, CellRange, CellValue, Error, HeaderColumn, Result, RowValues,
    SddfHeader, Workbook, Worksheet, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export I/O types
pub use sddf_xlsx::{PatchReport, XlsxError, XlsxPatcher, XlsxReader, XlsxWriter};

use std::path::Path;

/// Workbook file used when no path is given
pub const DEFAULT_WORKBOOK: &str = "TestData.xlsx";

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        ensure_xlsx(path)?;
        XlsxReader::read_file(path).map_err(|e| from_xlsx(path, e))
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        ensure_xlsx(path)?;
        XlsxWriter::write_file(self, path).map_err(|e| from_xlsx(path, e))
    }
}

/// Reject paths that are not `.xlsx`/`.xlsm`
pub(crate) fn ensure_xlsx(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(()),
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Map an XLSX error for `path` into the core error type
pub(crate) fn from_xlsx(path: &Path, err: XlsxError) -> Error {
    match err {
        XlsxError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Error::NotFound(path.to_path_buf())
        }
        XlsxError::Io(e) => Error::Io(e),
        XlsxError::Core(e) => e,
        other => Error::other(other.to_string()),
    }
}
