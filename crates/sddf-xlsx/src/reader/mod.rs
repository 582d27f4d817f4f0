//! XLSX reader

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::package::read_workbook_parts;
use crate::xml::{attr, cell_address, decode_excel_escapes, row_index};
use sddf_core::{CellError, CellValue, Workbook, Worksheet};

/// XLSX file reader
///
/// Loads cell values only. Formula cells yield their cached result, and
/// styles, comments and other sheet features are ignored.
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    ///
    /// The active sheet must load cleanly. Any other sheet that fails to
    /// load is logged and left out.
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        let parts = read_workbook_parts(&mut archive)?;
        let (active_entry, _) = parts.active_worksheet()?;
        let active_name = active_entry.name.clone();
        let shared_strings = Self::read_shared_strings(&mut archive)?;

        let mut workbook = Workbook::empty();
        let mut active = None;

        for (idx, entry) in parts.sheets.iter().enumerate() {
            let Some(path) = entry.path.as_deref() else {
                log::debug!("skipping non-worksheet sheet '{}'", entry.name);
                continue;
            };

            let is_active = idx == parts.active;
            if !is_active && entry.name == active_name {
                log::warn!("skipping sheet '{}': name clashes with the active sheet", entry.name);
                continue;
            }

            let mut worksheet = Worksheet::new(entry.name.clone());
            let loaded = Self::read_worksheet(&mut archive, path, &mut worksheet, &shared_strings)
                .and_then(|()| workbook.add_existing_worksheet(worksheet).map_err(XlsxError::from));

            match loaded {
                Ok(sheet_idx) if is_active => active = Some(sheet_idx),
                Ok(_) => {}
                Err(e) if is_active => return Err(e),
                Err(e) => log::warn!("skipping sheet '{}': {}", entry.name, e),
            }
        }

        let active = active.ok_or_else(|| {
            XlsxError::InvalidFormat(format!("active sheet '{}' was not loaded", active_name))
        })?;
        workbook.set_active_sheet(active)?;

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs repeat the text for furigana; they are not part of the value
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Ok(Event::CData(e)) if in_t => {
                    current_string.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        log::debug!("read {} shared string(s)", strings.len());
        Ok(strings)
    }

    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        let mut buf = Vec::new();

        let mut current_row: Option<u32> = None;
        let mut next_col: u16 = 0;

        // Current cell state
        let mut cell = PendingCell::default();
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        let row = row_index(&e, current_row);
                        current_row = Some(row);
                        next_col = 0;
                    }
                    b"c" => {
                        let addr = cell_address(&e, current_row.unwrap_or(0), next_col);
                        next_col = addr.col.saturating_add(1);
                        cell = PendingCell {
                            row: addr.row,
                            col: addr.col,
                            cell_type: attr(&e, b"t"),
                            ..PendingCell::default()
                        };
                        in_cell = true;
                    }
                    b"v" if in_cell => in_value = true,
                    b"is" if in_cell => in_inline_str = true,
                    b"rPh" if in_inline_str => in_phonetic = true,
                    b"t" if in_inline_str && !in_phonetic => {
                        in_inline_text = true;
                        cell.inline.get_or_insert_with(String::new);
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"row" => {
                        current_row = Some(row_index(&e, current_row));
                        next_col = 0;
                    }
                    b"c" => {
                        // A value-less cell still occupies its column
                        let addr = cell_address(&e, current_row.unwrap_or(0), next_col);
                        next_col = addr.col.saturating_add(1);
                    }
                    b"t" if in_inline_str && !in_phonetic => {
                        cell.inline.get_or_insert_with(String::new);
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"c" => {
                        let value = cell.resolve(shared_strings)?;
                        worksheet.set_cell_value_at(cell.row, cell.col, value)?;
                        in_cell = false;
                    }
                    b"v" => in_value = false,
                    b"is" => in_inline_str = false,
                    b"rPh" => in_phonetic = false,
                    b"t" => in_inline_text = false,
                    b"sheetData" => break,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_value => {
                    cell.value
                        .get_or_insert_with(String::new)
                        .push_str(&e.unescape()?);
                }
                Ok(Event::Text(e)) if in_inline_text => {
                    if let Some(inline) = cell.inline.as_mut() {
                        inline.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        log::debug!(
            "read {} cell(s) from {} ('{}')",
            worksheet.cell_count(),
            path,
            worksheet.name()
        );
        Ok(())
    }
}

/// Raw pieces of a `<c>` element collected while parsing
#[derive(Debug, Default)]
struct PendingCell {
    row: u32,
    col: u16,
    cell_type: Option<String>,
    /// Text of `<v>`
    value: Option<String>,
    /// Text of `<is>` (inline rich or plain string)
    inline: Option<String>,
}

impl PendingCell {
    /// Turn the collected pieces into a value
    ///
    /// Formula cells are handled the same way: `<v>` holds the cached result.
    fn resolve(&self, shared_strings: &[String]) -> XlsxResult<CellValue> {
        if self.cell_type.as_deref() == Some("inlineStr") {
            return Ok(match &self.inline {
                Some(s) => CellValue::String(decode_excel_escapes(s)),
                None => self
                    .value
                    .as_deref()
                    .map_or(CellValue::Empty, |v| CellValue::String(decode_excel_escapes(v))),
            });
        }

        let Some(value) = self.value.as_deref() else {
            return Ok(CellValue::Empty);
        };

        let cell_value = match self.cell_type.as_deref() {
            // Shared string
            Some("s") => {
                let idx: usize = value.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", value))
                })?;
                let s = shared_strings.get(idx).ok_or_else(|| {
                    XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                })?;
                CellValue::String(s.clone())
            }

            // Boolean
            Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

            // Error
            Some("e") => CellError::parse(value)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::String(value.to_string())),

            // Formula string result
            Some("str") => CellValue::String(decode_excel_escapes(value)),

            // Number (default type or explicit "n"); ISO dates ("d") stay text
            None | Some("n") => match value.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::String(value.to_string()),
            },

            // Unknown type - treat as string
            Some(_) => CellValue::String(value.to_string()),
        };

        Ok(cell_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    const CONTENT_TYPES: &[u8] = br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;
    const ROOT_RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;
    const WORKBOOK_RELS: &[u8] = br#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;

    fn build_xlsx(workbook_xml: &str, parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(CONTENT_TYPES).unwrap();
            zip.start_file("_rels/.rels", options).unwrap();
            zip.write_all(ROOT_RELS).unwrap();
            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(workbook_xml.as_bytes()).unwrap();
            zip.start_file("xl/_rels/workbook.xml.rels", options)
                .unwrap();
            zip.write_all(WORKBOOK_RELS).unwrap();

            for (name, content) in parts {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }

    fn one_sheet_workbook() -> &'static str {
        r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#
    }

    #[test]
    fn test_read_empty_xlsx() {
        let data = build_xlsx(
            one_sheet_workbook(),
            &[(
                "xl/worksheets/sheet1.xml",
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#,
            )],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        assert_eq!(workbook.sheet_count(), 1);
        assert_eq!(workbook.active_worksheet().unwrap().name(), "Sheet1");
        assert!(workbook.active_worksheet().unwrap().is_empty());
    }

    #[test]
    fn test_read_value_types() {
        let data = build_xlsx(
            one_sheet_workbook(),
            &[
                (
                    "xl/sharedStrings.xml",
                    r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3"><si><t>TestID</t></si><si><r><t>user</t></r><r><t>name</t></r></si><si><t xml:space="preserve"> padded </t><rPh sb="0" eb="1"><t>ignored</t></rPh></si></sst>"#,
                ),
                (
                    "xl/worksheets/sheet1.xml",
                    r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2"><v>1</v></c><c r="B2" t="inlineStr"><is><t>a&amp;b</t></is></c><c r="C2" t="b"><v>1</v></c><c r="D2" t="e"><v>#DIV/0!</v></c></row>
<row r="3"><c r="A3"><f>A2*2</f><v>2.5</v></c><c r="B3" t="str"><f>"x"&amp;"y"</f><v>xy</v></c><c r="C3"><f>NOW()</f></c><c r="D3" s="1"/></row>
</sheetData></worksheet>"#,
                ),
            ],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        let sheet = workbook.active_worksheet().unwrap();

        assert_eq!(sheet.get_value("A1").unwrap(), CellValue::from("TestID"));
        assert_eq!(sheet.get_value("B1").unwrap(), CellValue::from("username"));
        assert_eq!(sheet.get_value("C1").unwrap(), CellValue::from(" padded "));
        assert_eq!(sheet.get_value("A2").unwrap(), CellValue::Number(1.0));
        assert_eq!(sheet.get_value("B2").unwrap(), CellValue::from("a&b"));
        assert_eq!(sheet.get_value("C2").unwrap(), CellValue::Boolean(true));
        assert_eq!(
            sheet.get_value("D2").unwrap(),
            CellValue::Error(CellError::Div0)
        );
        assert_eq!(sheet.get_value("A3").unwrap(), CellValue::Number(2.5));
        assert_eq!(sheet.get_value("B3").unwrap(), CellValue::from("xy"));
        assert_eq!(sheet.get_value("C3").unwrap(), CellValue::Empty);
        assert_eq!(sheet.get_value("D3").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_read_positional_cells_and_rows() {
        let data = build_xlsx(
            one_sheet_workbook(),
            &[(
                "xl/worksheets/sheet1.xml",
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row><c t="inlineStr"><is><t>a</t></is></c><c/><c><v>3</v></c></row><row><c><v>4</v></c></row></sheetData></worksheet>"#,
            )],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        let sheet = workbook.active_worksheet().unwrap();

        assert_eq!(sheet.get_value("A1").unwrap(), CellValue::from("a"));
        assert_eq!(sheet.get_value("B1").unwrap(), CellValue::Empty);
        assert_eq!(sheet.get_value("C1").unwrap(), CellValue::Number(3.0));
        assert_eq!(sheet.get_value("A2").unwrap(), CellValue::Number(4.0));
    }

    #[test]
    fn test_read_active_tab() {
        let workbook_xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="First" sheetId="1" r:id="rId1"/><sheet name="Second" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let data = build_xlsx(
            workbook_xml,
            &[
                (
                    "xl/worksheets/sheet1.xml",
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>1</v></c></row></sheetData></worksheet>"#,
                ),
                (
                    "xl/worksheets/sheet2.xml",
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1"><v>2</v></c></row></sheetData></worksheet>"#,
                ),
            ],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        assert_eq!(workbook.sheet_count(), 2);
        let active = workbook.active_worksheet().unwrap();
        assert_eq!(active.name(), "Second");
        assert_eq!(active.get_value("A1").unwrap(), CellValue::Number(2.0));
    }

    #[test]
    fn test_read_prefixed_elements() {
        let data = build_xlsx(
            one_sheet_workbook(),
            &[(
                "xl/worksheets/sheet1.xml",
                r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData><x:row r="1"><x:c r="B1" t="inlineStr"><x:is><x:t>hi</x:t></x:is></x:c></x:row></x:sheetData></x:worksheet>"#,
            )],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        let sheet = workbook.active_worksheet().unwrap();
        assert_eq!(sheet.get_value("B1").unwrap(), CellValue::from("hi"));
    }

    #[test]
    fn test_broken_inactive_sheet_is_skipped() {
        let workbook_xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="Broken" sheetId="1" r:id="rId1"/><sheet name="Logins" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let data = build_xlsx(
            workbook_xml,
            &[
                (
                    "xl/worksheets/sheet1.xml",
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>99</v></c></row></sheetData></worksheet>"#,
                ),
                (
                    "xl/worksheets/sheet2.xml",
                    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>TestID</t></is></c></row></sheetData></worksheet>"#,
                ),
            ],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        assert_eq!(workbook.sheet_count(), 1);
        let active = workbook.active_worksheet().unwrap();
        assert_eq!(active.name(), "Logins");
        assert_eq!(active.get_value("A1").unwrap(), CellValue::from("TestID"));
    }

    #[test]
    fn test_broken_active_sheet_fails() {
        let data = build_xlsx(
            one_sheet_workbook(),
            &[(
                "xl/worksheets/sheet1.xml",
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>99</v></c></row></sheetData></worksheet>"#,
            )],
        );

        assert!(XlsxReader::read(Cursor::new(data)).is_err());
    }

    #[test]
    fn test_inactive_sheet_with_active_name_is_skipped() {
        let workbook_xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="Data" sheetId="1" r:id="rId1"/><sheet name="Data" sheetId="2" r:id="rId2"/></sheets></workbook>"#;
        let sheet = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData/></worksheet>"#;
        let data = build_xlsx(
            workbook_xml,
            &[("xl/worksheets/sheet1.xml", sheet), ("xl/worksheets/sheet2.xml", sheet)],
        );

        let workbook = XlsxReader::read(Cursor::new(data)).unwrap();
        assert_eq!(workbook.sheet_count(), 1);
        assert_eq!(workbook.active_worksheet().unwrap().name(), "Data");
    }

    #[test]
    fn test_missing_content_types() {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            zip.start_file("hello.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"not a workbook").unwrap();
            zip.finish().unwrap();
        }

        let err = XlsxReader::read(Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, XlsxError::InvalidFormat(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = XlsxReader::read(Cursor::new(b"plain text".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
