//! End-to-end tests for the three workbook operations (write fixture -> run -> verify output)

use std::io::Write;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use sddf::prelude::*;
use sddf::CellError;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Save a single-sheet workbook built from `rows` (row-major, starting at A1)
fn fixture(dir: &TempDir, rows: &[&[CellValue]]) -> PathBuf {
    let mut wb = Workbook::new();
    let sheet = wb.worksheet_mut(0).unwrap();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet
                .set_cell_value_at(r as u32, c as u16, value.clone())
                .unwrap();
        }
    }

    let path = dir.path().join("TestData.xlsx");
    wb.save(&path).unwrap();
    path
}

fn output_of<F>(run: F) -> String
where
    F: FnOnce(&mut Vec<u8>),
{
    let mut out = Vec::new();
    run(&mut out);
    String::from_utf8(out).unwrap()
}

fn header_of(path: &Path) -> Vec<CellValue> {
    let wb = Workbook::open(path).unwrap();
    wb.active_worksheet().unwrap().header_values().values
}

fn dir_listing(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn s(v: &str) -> CellValue {
    CellValue::from(v)
}

fn n(v: f64) -> CellValue {
    CellValue::from(v)
}

// === Header Inspector ===

#[test]
fn test_inspect_prints_first_row() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("A"), s("B"), s("C")], &[n(1.0), n(2.0), n(3.0)]]);

    let out = output_of(|out| {
        let header = inspect_headers(&path, out, false).unwrap().unwrap();
        assert_eq!(header.len(), 3);
    });
    assert_eq!(out, "Headers: [A, B, C]\n");
}

#[test]
fn test_inspect_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TestData.xlsx");

    let out = output_of(|out| {
        assert!(inspect_headers(&path, out, false).unwrap().is_none());
    });
    assert!(out.starts_with("Error: "));
    assert!(out.contains("TestData.xlsx"));
    assert!(out.trim_end().ends_with("not found"));
}

#[test]
fn test_inspect_empty_sheet() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[]);

    let out = output_of(|out| {
        inspect_headers(&path, out, false).unwrap();
    });
    assert_eq!(out, "Headers: []\n");
}

#[test]
fn test_inspect_check_reports_layout() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("id"), s("user")]]);

    let out = output_of(|out| {
        inspect_headers(&path, out, true).unwrap();
    });
    assert_eq!(
        out,
        "Headers: [id, user]\nHeader row differs from SDDF layout\n"
    );

    let labels: Vec<CellValue> = SddfHeader::labels().iter().map(|l| s(l)).collect();
    let path = fixture(&dir, &[labels.as_slice()]);
    let out = output_of(|out| {
        inspect_headers(&path, out, true).unwrap();
    });
    assert!(out.ends_with("Header row matches SDDF layout\n"));
}

#[test]
fn test_inspect_rejects_non_xlsx() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TestData.csv");
    std::fs::write(&path, "a,b\n").unwrap();

    let mut out = Vec::new();
    let err = inspect_headers(&path, &mut out, false).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

// === Content Dumper ===

#[test]
fn test_dump_prints_rows_between_markers() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[n(1.0), s("x")], &[n(2.0), s("y")]]);

    let out = output_of(|out| {
        assert_eq!(dump_rows(&path, out, false).unwrap(), 2);
    });
    assert_eq!(
        out,
        "--- Excel Content ---\n(1, x)\n(2, y)\n---------------------\n"
    );
}

#[test]
fn test_dump_empty_sheet_prints_only_markers() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[]);

    let out = output_of(|out| {
        assert_eq!(dump_rows(&path, out, false).unwrap(), 0);
    });
    assert_eq!(out, "--- Excel Content ---\n---------------------\n");
}

#[test]
fn test_dump_data_only_skips_header() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("TestID"), s("username")]]);

    let out = output_of(|out| {
        dump_rows(&path, out, false).unwrap();
    });
    assert_eq!(
        out,
        "--- Excel Content ---\n(TestID, username)\n---------------------\n"
    );

    let out = output_of(|out| {
        assert_eq!(dump_rows(&path, out, true).unwrap(), 0);
    });
    assert_eq!(out, "--- Excel Content ---\n---------------------\n");
}

#[test]
fn test_dump_renders_gaps_and_types() {
    let dir = TempDir::new().unwrap();
    let path = fixture(
        &dir,
        &[
            &[s("TestID"), s("ok"), s("when")],
            &[n(1.5), CellValue::from(true), CellValue::Empty],
            &[],
            &[CellValue::Empty, CellValue::Error(CellError::Div0), n(3.0)],
        ],
    );

    let out = output_of(|out| {
        dump_rows(&path, out, false).unwrap();
    });
    assert_eq!(
        out,
        "--- Excel Content ---\n\
         (TestID, ok, when)\n\
         (1.5, TRUE, )\n\
         (, , )\n\
         (, #DIV/0!, 3)\n\
         ---------------------\n"
    );
}

#[test]
fn test_dump_prints_date_serials_as_numbers() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("Execution_Time")], &[n(45123.5)]]);

    let out = output_of(|out| {
        dump_rows(&path, out, true).unwrap();
    });
    assert_eq!(out, "--- Excel Content ---\n(45123.5)\n---------------------\n");
}

#[test]
fn test_dump_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let mut out = Vec::new();
    let err = dump_rows(&dir.path().join("TestData.xlsx"), &mut out, false).unwrap_err();
    assert!(err.is_not_found());
    assert!(out.is_empty());
}

// === Header Fixer ===

#[test]
fn test_fix_restores_labels_and_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = fixture(
        &dir,
        &[
            &[s("id"), s("user")],
            &[n(1.0), s("alice"), s("secret")],
            &[n(2.0), s("bob"), s("hunter2")],
        ],
    );

    let out = output_of(|out| {
        let report = fix_headers(&path, out).unwrap();
        assert_eq!(report.replaced, 2);
        assert_eq!(report.inserted, 5);
    });
    assert_eq!(
        out,
        "Excel Headers Restored to SDDF Standard: [TestID, username, password, expected_error, expected_title, Result, Execution_Time]\n"
    );

    let wb = Workbook::open(&path).unwrap();
    let sheet = wb.active_worksheet().unwrap();
    assert!(SddfHeader::matches(&sheet.header_values().values));
    assert_eq!(sheet.row_values(1, 0, 2).to_string(), "(1, alice, secret)");
    assert_eq!(sheet.row_values(2, 0, 2).to_string(), "(2, bob, hunter2)");
}

#[test]
fn test_fix_keeps_columns_beyond_g() {
    let dir = TempDir::new().unwrap();
    let row: Vec<CellValue> = (0..9).map(|i| s(&format!("old{}", i))).collect();
    let path = fixture(&dir, &[row.as_slice()]);

    output_of(|out| {
        fix_headers(&path, out).unwrap();
    });

    let header = header_of(&path);
    assert_eq!(header.len(), 9);
    assert_eq!(header[6].as_string(), Some("Execution_Time"));
    assert_eq!(header[7].as_string(), Some("old7"));
    assert_eq!(header[8].as_string(), Some("old8"));
}

#[test]
fn test_fix_twice_is_stable() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("x")], &[n(1.0)]]);

    output_of(|out| {
        fix_headers(&path, out).unwrap();
    });
    let first = header_of(&path);

    output_of(|out| {
        let report = fix_headers(&path, out).unwrap();
        assert_eq!(report.replaced, 7);
        assert_eq!(report.inserted, 0);
    });
    assert_eq!(header_of(&path), first);
    assert_eq!(
        Workbook::open(&path).unwrap().active_worksheet().unwrap().cell_count(),
        8
    );
}

#[test]
fn test_fix_empty_sheet_creates_header_row() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[]);

    output_of(|out| {
        assert!(fix_headers(&path, out).unwrap().row_created);
    });
    assert!(SddfHeader::matches(&header_of(&path)));
}

#[test]
fn test_fix_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TestData.xlsx");

    let mut out = Vec::new();
    let err = fix_headers(&path, &mut out).unwrap_err();
    assert!(err.is_not_found());
    assert!(out.is_empty());
    assert!(!path.exists());
}

#[test]
fn test_fix_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("a")]]);

    output_of(|out| {
        fix_headers(&path, out).unwrap();
    });

    assert_eq!(dir_listing(&dir), vec!["TestData.xlsx".to_string()]);
}

/// Rewrite the archive at `path` with entry `name` holding `content`
fn replace_entry(path: &Path, name: &str, content: &[u8]) {
    let original = std::fs::read(path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(original)).unwrap();
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i).unwrap();
        if file.name() == name {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        } else {
            zip.raw_copy_file(file).unwrap();
        }
    }
    zip.finish().unwrap();
}

fn assert_fix_fails_untouched(dir: &TempDir, path: &Path) {
    let before = std::fs::read(path).unwrap();
    let listing = dir_listing(dir);

    let mut out = Vec::new();
    assert!(fix_headers(path, &mut out).is_err());
    assert!(out.is_empty());
    assert_eq!(std::fs::read(path).unwrap(), before);
    assert_eq!(dir_listing(dir), listing);
}

#[test]
fn test_fix_workbook_without_parts_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("TestData.xlsx");
    {
        let mut zip = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(br#"<?xml version="1.0"?><Types/>"#).unwrap();
        zip.finish().unwrap();
    }

    assert_fix_fails_untouched(&dir, &path);
}

#[test]
fn test_fix_broken_sheet_xml_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let path = fixture(&dir, &[&[s("id")], &[n(1.0)]]);
    // the package parts are fine, so the copy is underway when the sheet fails
    replace_entry(
        &path,
        "xl/worksheets/sheet1.xml",
        br#"<worksheet><sheetData><row r="1"><c r="A1"></row></sheetData></worksheet>"#,
    );

    assert_fix_fails_untouched(&dir, &path);
}
