//! In-place header row patching.
//!
//! The archive is rebuilt entry by entry: every entry except the active
//! worksheet part is passed through with `raw_copy_file` (no recompression),
//! and the worksheet XML is streamed through quick-xml with only row 1
//! rewritten. Styles, shared strings, other rows, and cells to the right of
//! the header stay exactly as they were.

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use tempfile::NamedTempFile;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{XlsxError, XlsxResult};
use crate::package::read_workbook_parts;
use crate::xml::{attr, cell_address, encode_excel_escapes, prefix_of, row_index};
use sddf_core::{CellAddress, CellRange, MAX_COLS};

/// What a header patch changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Name of the patched (active) sheet
    pub sheet_name: String,
    /// Zip path of the patched worksheet part
    pub sheet_path: String,
    /// Header cells that existed and were overwritten
    pub replaced: usize,
    /// Header cells that did not exist and were added
    pub inserted: usize,
    /// Whether row 1 itself had to be created
    pub row_created: bool,
}

/// Rewrites the header row of an existing workbook
pub struct XlsxPatcher;

impl XlsxPatcher {
    /// Overwrite row 1 of the active sheet of the file at `path`
    ///
    /// The new archive goes to a fresh temporary file in the same directory,
    /// which takes over the original's permissions and is then persisted
    /// over it. A failure at any point leaves the original file intact.
    pub fn set_header_row_file<P: AsRef<Path>>(
        path: P,
        labels: &[&str],
    ) -> XlsxResult<PatchReport> {
        let path = path.as_ref();
        let source = File::open(path)?;
        let permissions = source.metadata()?.permissions();

        let mut patched = Cursor::new(Vec::new());
        let report = Self::set_header_row(BufReader::new(source), &mut patched, labels)?;

        let mut tmp = NamedTempFile::new_in(parent_dir_or_dot(path))?;
        tmp.write_all(patched.get_ref())?;
        tmp.as_file_mut().flush()?;
        tmp.as_file().set_permissions(permissions)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| XlsxError::Io(e.error))?;

        log::debug!(
            "patched header of '{}' in {}: {} replaced, {} inserted",
            report.sheet_name,
            path.display(),
            report.replaced,
            report.inserted
        );
        Ok(report)
    }

    /// Copy the archive from `reader` to `writer`, overwriting row 1 of the
    /// active sheet with `labels` (column A onwards)
    pub fn set_header_row<R: Read + Seek, W: Write + Seek>(
        reader: R,
        writer: W,
        labels: &[&str],
    ) -> XlsxResult<PatchReport> {
        if labels.is_empty() {
            return Err(XlsxError::InvalidArgument(
                "header row needs at least one label".into(),
            ));
        }
        if labels.len() > MAX_COLS as usize {
            return Err(XlsxError::InvalidArgument(format!(
                "{} labels exceed the {} column limit",
                labels.len(),
                MAX_COLS
            )));
        }

        let mut archive = ZipArchive::new(reader)?;
        let parts = read_workbook_parts(&mut archive)?;
        let (entry, sheet_path) = parts.active_worksheet()?;
        let sheet_name = entry.name.clone();
        let sheet_path = sheet_path.to_string();

        let mut out = ZipWriter::new(writer);
        let mut stats = None;

        for i in 0..archive.len() {
            let name = archive.by_index_raw(i)?.name().to_string();

            if name == sheet_path {
                let mut file = archive.by_index(i)?;
                let method = match file.compression() {
                    CompressionMethod::Stored => CompressionMethod::Stored,
                    _ => CompressionMethod::Deflated,
                };
                let mut xml = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut xml)?;
                drop(file);

                let (patched, sheet_stats) = patch_sheet_xml(&xml, labels)?;
                let options = zip::write::SimpleFileOptions::default().compression_method(method);
                out.start_file(name.as_str(), options)?;
                out.write_all(&patched)?;
                stats = Some(sheet_stats);
            } else {
                out.raw_copy_file(archive.by_index_raw(i)?)?;
            }
        }

        out.finish()?;

        let stats = stats.ok_or_else(|| XlsxError::MissingPart(sheet_path.clone()))?;
        Ok(PatchReport {
            sheet_name,
            sheet_path,
            replaced: stats.replaced,
            inserted: stats.inserted,
            row_created: stats.row_created,
        })
    }
}

fn parent_dir_or_dot(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

#[derive(Debug, Default)]
struct SheetStats {
    replaced: usize,
    inserted: usize,
    row_created: bool,
}

/// One child of the original row 1, with the column it occupies
struct RowChild<'a> {
    /// `None` for non-cell children such as `extLst`
    col: Option<u16>,
    style: Option<String>,
    events: Vec<Event<'a>>,
}

/// Stream a worksheet part, replacing the header cells of row 1
fn patch_sheet_xml(xml: &[u8], labels: &[&str]) -> XlsxResult<(Vec<u8>, SheetStats)> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 512));
    let mut stats = SheetStats::default();

    let header_range = CellRange::from_indices(0, 0, 0, (labels.len() - 1) as u16);
    let mut prefix = String::new();
    let mut in_sheet_data = false;
    let mut header_done = false;
    let mut previous_row: Option<u32> = None;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Eof => break,

            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                prefix = prefix_of(e.name().as_ref());
                in_sheet_data = true;
                writer.write_event(event)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"sheetData" => {
                // <sheetData/> becomes <sheetData><row r="1">...</row></sheetData>
                prefix = prefix_of(e.name().as_ref());
                let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                writer.write_event(Event::Start(e))?;
                write_header_row(&mut writer, &prefix, None, Vec::new(), labels, &mut stats)?;
                writer.write_event(Event::End(BytesEnd::new(end_name)))?;
                header_done = true;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                if !header_done {
                    write_header_row(&mut writer, &prefix, None, Vec::new(), labels, &mut stats)?;
                    header_done = true;
                }
                in_sheet_data = false;
                writer.write_event(event)?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && e.local_name().as_ref() == b"row" =>
            {
                let row = row_index(e, previous_row);
                previous_row = Some(row);

                if row == 0 && !header_done {
                    let row_start = e.clone().into_owned();
                    let children = match event {
                        Event::Start(_) => collect_row_children(&mut reader)?,
                        _ => Vec::new(),
                    };
                    write_header_row(
                        &mut writer,
                        &prefix,
                        Some(row_start),
                        children,
                        labels,
                        &mut stats,
                    )?;
                    header_done = true;
                    continue;
                }

                if !header_done {
                    write_header_row(&mut writer, &prefix, None, Vec::new(), labels, &mut stats)?;
                    header_done = true;
                }
                writer.write_event(event)?;
            }

            Event::Start(ref e) | Event::Empty(ref e)
                if !in_sheet_data && e.local_name().as_ref() == b"dimension" =>
            {
                let widened = widen_dimension(e, &header_range);
                match event {
                    Event::Start(_) => writer.write_event(Event::Start(widened))?,
                    _ => writer.write_event(Event::Empty(widened))?,
                }
            }

            other => writer.write_event(other)?,
        }
    }

    Ok((writer.into_inner(), stats))
}

/// Read the children of a `<row>` up to its end tag, grouped per cell
fn collect_row_children<'a>(reader: &mut Reader<&'a [u8]>) -> XlsxResult<Vec<RowChild<'a>>> {
    let mut children: Vec<RowChild<'a>> = Vec::new();
    let mut next_col: u16 = 0;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => {
                return Err(XlsxError::Parse("unterminated <row> in worksheet".into()));
            }
            Event::End(e) if depth == 0 && e.local_name().as_ref() == b"row" => break,
            Event::Text(t) if depth == 0 && t.iter().all(u8::is_ascii_whitespace) => continue,
            _ => {}
        }

        if depth == 0 {
            let (col, style) = match &event {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                    let addr = cell_address(e, 0, next_col);
                    next_col = addr.col.saturating_add(1);
                    (Some(addr.col), attr(e, b"s"))
                }
                _ => (None, None),
            };
            children.push(RowChild {
                col,
                style,
                events: Vec::new(),
            });
        }

        match &event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }

        if let Some(child) = children.last_mut() {
            child.events.push(event);
        }
    }

    Ok(children)
}

/// Write row 1 with `labels` in columns A.. and every other original child
fn write_header_row(
    writer: &mut Writer<Vec<u8>>,
    prefix: &str,
    original: Option<BytesStart<'static>>,
    children: Vec<RowChild<'_>>,
    labels: &[&str],
    stats: &mut SheetStats,
) -> XlsxResult<()> {
    let row_name = format!("{}row", prefix);
    let width = labels.len();

    let row_start = match original {
        Some(e) => {
            // spans is only a load hint and would no longer cover the header
            let mut start = BytesStart::new(row_name.clone());
            for a in e.attributes().flatten() {
                if a.key.as_ref() != b"spans" {
                    start.push_attribute(a);
                }
            }
            start
        }
        None => {
            stats.row_created = true;
            let mut start = BytesStart::new(row_name.clone());
            start.push_attribute(("r", "1"));
            start
        }
    };
    writer.write_event(Event::Start(row_start))?;

    let mut kept = Vec::new();
    let mut styles: Vec<Option<String>> = vec![None; width];
    let mut present = vec![false; width];
    for child in children {
        match child.col {
            Some(col) if (col as usize) < width => {
                present[col as usize] = true;
                styles[col as usize] = child.style;
            }
            _ => kept.push(child),
        }
    }

    let cell_name = format!("{}c", prefix);
    let is_name = format!("{}is", prefix);
    let t_name = format!("{}t", prefix);

    for (col, label) in labels.iter().enumerate() {
        if present[col] {
            stats.replaced += 1;
        } else {
            stats.inserted += 1;
        }

        let cell_ref = CellAddress::new(0, col as u16).to_a1_string();
        let mut cell = BytesStart::new(cell_name.as_str());
        cell.push_attribute(("r", cell_ref.as_str()));
        if let Some(style) = &styles[col] {
            cell.push_attribute(("s", style.as_str()));
        }
        cell.push_attribute(("t", "inlineStr"));

        let mut text = BytesStart::new(t_name.as_str());
        if label.trim() != *label {
            text.push_attribute(("xml:space", "preserve"));
        }

        writer.write_event(Event::Start(cell))?;
        writer.write_event(Event::Start(BytesStart::new(is_name.as_str())))?;
        writer.write_event(Event::Start(text))?;
        let encoded = encode_excel_escapes(label);
        writer.write_event(Event::Text(BytesText::new(&encoded)))?;
        writer.write_event(Event::End(BytesEnd::new(t_name.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(is_name.as_str())))?;
        writer.write_event(Event::End(BytesEnd::new(cell_name.as_str())))?;
    }

    for child in kept {
        for event in child.events {
            writer.write_event(event)?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new(row_name)))?;
    Ok(())
}

/// Copy a `<dimension>` element with its `ref` grown to cover the header
fn widen_dimension(e: &BytesStart, header: &CellRange) -> BytesStart<'static> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut widened = BytesStart::new(name);

    for a in e.attributes().flatten() {
        if a.key.as_ref() != b"ref" {
            widened.push_attribute(a);
            continue;
        }

        let current = a.unescape_value().map(|v| v.into_owned()).unwrap_or_default();
        let new_ref = match CellRange::parse(&current) {
            Ok(range) => range.union(header).to_a1_string(),
            Err(_) => {
                log::warn!("unparseable dimension ref '{}'; leaving it as is", current);
                current
            }
        };
        widened.push_attribute(("ref", new_ref.as_str()));
    }

    widened
}
