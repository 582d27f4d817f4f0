//! Prelude module - common imports for sddf users
//!
//! ```rust
//! use sddf::prelude::*;
//! ```

pub use crate::{
    // Operations
    dump_rows,
    fix_headers,
    inspect_headers,

    CellAddress,
    CellRange,
    // Cell types
    CellValue,
    // Error types
    Error,
    // Header schema
    HeaderColumn,
    Result,
    RowValues,
    SddfHeader,

    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,

    // I/O types
    XlsxPatcher,
    XlsxReader,
    XlsxWriter,
};
