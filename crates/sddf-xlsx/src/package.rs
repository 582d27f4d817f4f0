//! Workbook-level package parts: where the workbook lives, which sheets it
//! has, which part holds each sheet, and which sheet is active.

use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use zip::ZipArchive;

use crate::error::{XlsxError, XlsxResult};
use crate::xml::{attr, resolve_target};

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// A `<sheet>` entry of workbook.xml
#[derive(Debug, Clone)]
pub(crate) struct SheetEntry {
    pub name: String,
    /// Zip path of the worksheet part; `None` for chartsheets and dialog sheets
    pub path: Option<String>,
}

/// Sheet listing plus the active tab
#[derive(Debug, Clone)]
pub(crate) struct WorkbookParts {
    pub sheets: Vec<SheetEntry>,
    pub active: usize,
}

impl WorkbookParts {
    /// The active sheet entry and its worksheet part path
    pub fn active_worksheet(&self) -> XlsxResult<(&SheetEntry, &str)> {
        let entry = self
            .sheets
            .get(self.active)
            .ok_or_else(|| XlsxError::InvalidFormat("workbook has no sheets".into()))?;
        let path = entry.path.as_deref().ok_or_else(|| {
            XlsxError::InvalidFormat(format!(
                "active sheet '{}' is not a worksheet",
                entry.name
            ))
        })?;
        Ok((entry, path))
    }
}

/// Read the sheet listing and active tab of an XLSX archive
pub(crate) fn read_workbook_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> XlsxResult<WorkbookParts> {
    if archive.by_name("[Content_Types].xml").is_err() {
        return Err(XlsxError::InvalidFormat(
            "Missing [Content_Types].xml".into(),
        ));
    }

    let workbook_part = find_workbook_part(archive)?;
    let (sheet_list, active_tab) = read_workbook_xml(archive, &workbook_part)?;

    let (base_dir, file_name) = match workbook_part.rsplit_once('/') {
        Some((dir, file)) => (dir.to_string(), file.to_string()),
        None => (String::new(), workbook_part.clone()),
    };
    let rels_part = if base_dir.is_empty() {
        format!("_rels/{}.rels", file_name)
    } else {
        format!("{}/_rels/{}.rels", base_dir, file_name)
    };
    let worksheet_paths = read_worksheet_rels(archive, &rels_part, &base_dir)?;

    let sheets: Vec<SheetEntry> = sheet_list
        .into_iter()
        .map(|(name, r_id)| SheetEntry {
            path: worksheet_paths.get(&r_id).cloned(),
            name,
        })
        .collect();

    let active = if active_tab < sheets.len() {
        active_tab
    } else {
        log::warn!(
            "activeTab {} out of range for {} sheet(s); using the first sheet",
            active_tab,
            sheets.len()
        );
        0
    };

    log::debug!(
        "workbook part {} lists {} sheet(s), active tab {}",
        workbook_part,
        sheets.len(),
        active
    );

    Ok(WorkbookParts { sheets, active })
}

/// Locate the main workbook part through the package relationships
fn find_workbook_part<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<String> {
    let file = match archive.by_name("_rels/.rels") {
        Ok(f) => f,
        Err(_) => return Ok(DEFAULT_WORKBOOK_PART.to_string()),
    };

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let is_office_document = attr(&e, b"Type")
                    .map_or(false, |t| t.ends_with("/officeDocument"));
                if is_office_document {
                    if let Some(target) = attr(&e, b"Target") {
                        return Ok(resolve_target("", &target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(DEFAULT_WORKBOOK_PART.to_string())
}

/// Read workbook.xml to get sheet names, rIds and the active tab
fn read_workbook_xml<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> XlsxResult<(Vec<(String, String)>, usize)> {
    let file = archive
        .by_name(part)
        .map_err(|_| XlsxError::MissingPart(part.to_string()))?;

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut active_tab = None;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"sheet" => {
                    if let (Some(name), Some(r_id)) = (attr(&e, b"name"), attr(&e, b"r:id")) {
                        sheets.push((name, r_id));
                    }
                }
                // Only the first view decides the active tab
                b"workbookView" if active_tab.is_none() => {
                    active_tab = Some(
                        attr(&e, b"activeTab")
                            .and_then(|v| v.parse::<usize>().ok())
                            .unwrap_or(0),
                    );
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab.unwrap_or(0)))
}

/// Read the workbook relationships, keeping worksheet targets only
fn read_worksheet_rels<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
    base_dir: &str,
) -> XlsxResult<HashMap<String, String>> {
    let file = archive
        .by_name(part)
        .map_err(|_| XlsxError::MissingPart(part.to_string()))?;

    let mut xml_reader = Reader::from_reader(BufReader::new(file));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target), Some(rel_type)) =
                    (attr(&e, b"Id"), attr(&e, b"Target"), attr(&e, b"Type"))
                {
                    if rel_type.ends_with("/worksheet") {
                        rels.insert(id, resolve_target(base_dir, &target));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}
