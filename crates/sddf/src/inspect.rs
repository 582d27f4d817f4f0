//! Header Inspector: print row 1 of the active sheet

use std::io::Write;
use std::path::Path;

use crate::{Error, Result, RowValues, SddfHeader, Workbook, WorkbookExt};

/// Print the header row of the workbook at `path` as `Headers: [a, b, c]`
///
/// A missing file is not an error: `Error: <path> not found` is printed
/// instead and `Ok(None)` returned. With `check`, a second line says whether
/// the row equals the SDDF layout.
pub fn inspect_headers<W: Write>(
    path: &Path,
    out: &mut W,
    check: bool,
) -> Result<Option<RowValues>> {
    if !path.exists() {
        log::debug!("{} does not exist", path.display());
        writeln!(out, "Error: {} not found", path.display())?;
        return Ok(None);
    }

    let workbook = Workbook::open(path)?;
    let sheet = workbook
        .active_worksheet()
        .ok_or_else(|| Error::other("workbook has no worksheets"))?;
    let header = sheet.header_values();
    log::debug!(
        "sheet '{}' header spans {} column(s)",
        sheet.name(),
        header.len()
    );

    writeln!(out, "Headers: {}", header.to_list_string())?;

    if check {
        if SddfHeader::matches(&header.values) {
            writeln!(out, "Header row matches SDDF layout")?;
        } else {
            writeln!(out, "Header row differs from SDDF layout")?;
        }
    }

    Ok(Some(header))
}
