//! Spreadsheet reading.
//!
//! Cells come back as text; numbers and Excel serial dates are recognised
//! later by [`crate::coerce`].

use std::path::Path;

use axes_core::{Error, Result};
use tracing::debug;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::table::{RawTable, RawValue};

/// Open a workbook, reporting a missing or corrupt file as a source error.
pub fn open_workbook(path: &Path) -> Result<Spreadsheet> {
    if !path.is_file() {
        return Err(Error::source(format!("workbook not found: {}", path.display())));
    }
    umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| Error::source(format!("cannot read {}: {e}", path.display())))
}

fn cell(ws: &Worksheet, col: u32, row: u32) -> RawValue {
    let value = ws.get_value((col, row));
    if value.trim().is_empty() {
        RawValue::Empty
    } else {
        RawValue::Text(value)
    }
}

/// Rows `first_row..` of a worksheet, skipping fully empty rows.
pub fn sheet_rows(ws: &Worksheet, first_row: u32) -> Vec<Vec<RawValue>> {
    let (max_col, max_row) = ws.get_highest_column_and_row();
    (first_row..=max_row)
        .map(|row| (1..=max_col).map(|col| cell(ws, col, row)).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
        .collect()
}

/// Convert a worksheet whose first row holds the column names.
pub fn table_from_sheet(ws: &Worksheet) -> RawTable {
    let (max_col, _) = ws.get_highest_column_and_row();
    let headers: Vec<String> = (1..=max_col).map(|col| ws.get_value((col, 1))).collect();
    RawTable::new(headers, sheet_rows(ws, 2))
}

/// Read a named sheet; its first row is the header.
pub fn read_sheet(path: impl AsRef<Path>, sheet: &str) -> Result<RawTable> {
    let path = path.as_ref();
    let book = open_workbook(path)?;
    let ws = book
        .get_sheet_by_name(sheet)
        .ok_or_else(|| Error::missing_sheet(sheet))?;
    let table = table_from_sheet(ws);
    debug!(path = %path.display(), sheet, rows = table.len(), columns = table.width(), "read sheet");
    Ok(table)
}

/// Read the first sheet of a workbook that has no header row.
///
/// Columns are named `A`, `B`, ... after their spreadsheet letters.
pub fn read_headerless(path: impl AsRef<Path>) -> Result<RawTable> {
    let path = path.as_ref();
    let book = open_workbook(path)?;
    let ws = book
        .get_sheet(&0)
        .ok_or_else(|| Error::source(format!("{} has no sheet", path.display())))?;
    let rows = sheet_rows(ws, 1);
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let headers = (0..width).map(column_letter).collect();
    debug!(path = %path.display(), rows = rows.len(), "read headerless sheet");
    Ok(RawTable::new(headers, rows))
}

/// Spreadsheet letter of a zero-based column index.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
