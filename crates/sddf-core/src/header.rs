//! The SDDF header layout
//!
//! Row 1 of a test-data sheet holds seven positionally significant labels.
//! `Result` and `Execution_Time` are dynamic write targets: an external test
//! harness fills those columns in after a run.

use std::fmt;

use crate::cell::CellValue;

/// One column of the SDDF header row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderColumn {
    TestId,
    Username,
    Password,
    ExpectedError,
    ExpectedTitle,
    Result,
    ExecutionTime,
}

impl HeaderColumn {
    /// All columns in sheet order
    pub const ALL: [HeaderColumn; 7] = [
        HeaderColumn::TestId,
        HeaderColumn::Username,
        HeaderColumn::Password,
        HeaderColumn::ExpectedError,
        HeaderColumn::ExpectedTitle,
        HeaderColumn::Result,
        HeaderColumn::ExecutionTime,
    ];

    /// The label written into row 1
    pub fn label(&self) -> &'static str {
        match self {
            HeaderColumn::TestId => "TestID",
            HeaderColumn::Username => "username",
            HeaderColumn::Password => "password",
            HeaderColumn::ExpectedError => "expected_error",
            HeaderColumn::ExpectedTitle => "expected_title",
            HeaderColumn::Result => "Result",
            HeaderColumn::ExecutionTime => "Execution_Time",
        }
    }

    /// Whether an external process writes this column after a test run
    pub fn is_dynamic_target(&self) -> bool {
        matches!(self, HeaderColumn::Result | HeaderColumn::ExecutionTime)
    }
}

impl fmt::Display for HeaderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The fixed seven-label header row
pub struct SddfHeader;

impl SddfHeader {
    /// Number of header columns
    pub const WIDTH: u16 = 7;

    /// Labels in sheet order
    pub fn labels() -> [&'static str; 7] {
        HeaderColumn::ALL.map(|c| c.label())
    }

    /// The columns an external process fills in
    pub fn dynamic_targets() -> impl Iterator<Item = HeaderColumn> {
        HeaderColumn::ALL
            .into_iter()
            .filter(HeaderColumn::is_dynamic_target)
    }

    /// Whether `values` is exactly the header row
    ///
    /// Trailing empty cells are ignored; any other extra column is a mismatch.
    pub fn matches(values: &[CellValue]) -> bool {
        let trimmed = values
            .iter()
            .rposition(|v| !v.is_empty())
            .map_or(&values[..0], |last| &values[..=last]);

        trimmed.len() == Self::WIDTH as usize
            && trimmed
                .iter()
                .zip(Self::labels())
                .all(|(value, label)| value.as_string() == Some(label))
    }

    /// Render the labels as a bracketed list
    pub fn display_list() -> String {
        format!("[{}]", Self::labels().join(", "))
    }
}
