//! Content Dumper: print every row of the active sheet

use std::io::Write;
use std::path::Path;

use crate::{Error, Result, Workbook, WorkbookExt};

/// First line of a dump
pub const CONTENT_START: &str = "--- Excel Content ---";
/// Last line of a dump
pub const CONTENT_END: &str = "---------------------";

/// Print the rows of the workbook at `path` between the marker lines
///
/// Each row is printed as `(v1, v2, ...)` from column A to the sheet's last
/// used column. With `data_only` the header row is skipped. Returns the
/// number of rows printed.
pub fn dump_rows<W: Write>(path: &Path, out: &mut W, data_only: bool) -> Result<usize> {
    let workbook = Workbook::open(path)?;
    let sheet = workbook
        .active_worksheet()
        .ok_or_else(|| Error::other("workbook has no worksheets"))?;

    writeln!(out, "{}", CONTENT_START)?;

    let mut printed = 0;
    for row in sheet.rows().skip(usize::from(data_only)) {
        writeln!(out, "{}", row)?;
        printed += 1;
    }

    writeln!(out, "{}", CONTENT_END)?;

    log::debug!("dumped {} row(s) of sheet '{}'", printed, sheet.name());
    Ok(printed)
}
