//! # sddf-xlsx
//!
//! XLSX (Office Open XML) support for SDDF workbooks:
//! - [`XlsxReader`] loads a workbook into the in-memory model
//! - [`XlsxWriter`] writes a workbook from scratch
//! - [`XlsxPatcher`] rewrites the header row of the active sheet in place,
//!   leaving every other part of the archive untouched

pub mod error;
pub mod patcher;
pub mod reader;
pub mod writer;

mod package;
mod xml;

pub use error::{XlsxError, XlsxResult};
pub use patcher::{PatchReport, XlsxPatcher};
pub use reader::XlsxReader;
pub use writer::{XlsxWriteOptions, XlsxWriter};
