//! Worksheet type

use std::collections::BTreeMap;
use std::fmt;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely in row-major order. Empty values are never
/// stored, so the used range only covers cells that hold something.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cell values keyed by row, then column
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell value by A1 address
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get a cell value by row/column (returns Empty if not set)
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.rows
            .get(&row)
            .and_then(|cells| cells.get(&col))
            .cloned()
            .unwrap_or_default()
    }

    /// Set a cell value by A1 address
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row/column
    ///
    /// Setting [`CellValue::Empty`] clears the cell.
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;

        let value = value.into();
        if value.is_empty() {
            self.clear_cell_at(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, value);
        }
        Ok(())
    }

    /// Clear a cell
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        if let Some(cells) = self.rows.get_mut(&row) {
            cells.remove(&col);
            if cells.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    /// Get the used range (smallest rectangle covering all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        let (&min_row, _) = self.rows.first_key_value()?;
        let (&max_row, _) = self.rows.last_key_value()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0;
        for cells in self.rows.values() {
            if let (Some((&first, _)), Some((&last, _))) =
                (cells.first_key_value(), cells.last_key_value())
            {
                min_col = min_col.min(first);
                max_col = max_col.max(last);
            }
        }

        Some(CellRange::from_indices(min_row, min_col, max_row, max_col))
    }

    /// Get the number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Check if the worksheet has no cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over all non-empty cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.rows.iter().flat_map(|(&row, cells)| {
            cells.iter().map(move |(&col, value)| (row, col, value))
        })
    }

    // === Row Access ===

    /// Values of `row` from `start_col` to `end_col` inclusive, gaps as Empty
    pub fn row_values(&self, row: u32, start_col: u16, end_col: u16) -> RowValues {
        let values = (start_col..=end_col)
            .map(|col| self.get_value_at(row, col))
            .collect();
        RowValues { row, values }
    }

    /// Values of the header row (row 1), from column A to the last used column
    ///
    /// Returns an empty row for an empty sheet.
    pub fn header_values(&self) -> RowValues {
        match self.used_range() {
            Some(range) => self.row_values(0, 0, range.end.col),
            None => RowValues {
                row: 0,
                values: Vec::new(),
            },
        }
    }

    /// Iterate over every row from row 1 to the last used row
    ///
    /// Each row spans column A to the last used column. Rows without cells
    /// are yielded as all-Empty rows.
    pub fn rows(&self) -> impl Iterator<Item = RowValues> + '_ {
        let bounds = self.used_range().map(|r| (0..=r.end.row, r.end.col));

        bounds.into_iter().flat_map(move |(rows, end_col)| {
            rows.map(move |row| self.row_values(row, 0, end_col))
        })
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }
}

/// The values of one worksheet row, in column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowValues {
    /// Row index (0-based)
    pub row: u32,
    /// Cell values, one per column
    pub values: Vec<CellValue>,
}

impl RowValues {
    /// Number of values in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row holds no values at all
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render as a bracketed list: `[a, b, c]`
    pub fn to_list_string(&self) -> String {
        format!("[{}]", self.joined())
    }

    /// Render as a tuple: `(a, b, c)`
    pub fn to_tuple_string(&self) -> String {
        format!("({})", self.joined())
    }

    fn joined(&self) -> String {
        self.values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_tuple_string())
    }
}
