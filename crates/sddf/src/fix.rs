//! Header Fixer: overwrite row 1 with the SDDF layout

use std::io::Write;
use std::path::Path;

use crate::{ensure_xlsx, from_xlsx, PatchReport, Result, SddfHeader, XlsxPatcher};

/// Rewrite A1..G1 of the active sheet of the workbook at `path` and save it
///
/// Only the header cells change; everything else in the file is kept as
/// is. Prints the restored labels on success.
pub fn fix_headers<W: Write>(path: &Path, out: &mut W) -> Result<PatchReport> {
    ensure_xlsx(path)?;

    let report = XlsxPatcher::set_header_row_file(path, &SddfHeader::labels())
        .map_err(|e| from_xlsx(path, e))?;

    if report.row_created {
        log::info!("sheet '{}' had no header row; inserted one", report.sheet_name);
    }

    writeln!(
        out,
        "Excel Headers Restored to SDDF Standard: {}",
        SddfHeader::display_list()
    )?;
    Ok(report)
}
