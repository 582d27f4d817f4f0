//! # sddf-core
//!
//! Core data structures for the SDDF test-data workbook tools.
//!
//! This crate provides the types shared by the format and facade crates:
//! - [`CellValue`] - Represents cell values (numbers, strings, booleans, errors)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Workbook`], [`Worksheet`] - In-memory view of a workbook
//! - [`SddfHeader`] - The fixed seven-column header layout
//!
//! ## Example
//!
//! ```rust
//! use sddf_core::{CellValue, SddfHeader, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.active_worksheet_mut().unwrap();
//!
//! for (col, label) in SddfHeader::labels().iter().enumerate() {
//!     sheet.set_cell_value_at(0, col as u16, *label).unwrap();
//! }
//! sheet.set_cell_value("A2", 1.0).unwrap();
//!
//! assert!(SddfHeader::matches(&sheet.header_values().values));
//! assert_eq!(sheet.get_value("A2").unwrap(), CellValue::Number(1.0));
//! ```

pub mod cell;
pub mod error;
pub mod header;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{CellAddress, CellError, CellRange, CellValue};
pub use error::{Error, Result};
pub use header::{HeaderColumn, SddfHeader};
pub use workbook::Workbook;
pub use worksheet::{RowValues, Worksheet};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
