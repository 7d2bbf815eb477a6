//! Raw tabular data as read from a spreadsheet.
//!
//! Cells keep whatever the source delivered; typing happens in the
//! normalizer through the helpers in [`crate::coerce`].

use serde::{Deserialize, Serialize};

use crate::columns::canonical_header;

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
}

impl RawValue {
    /// Whether the cell holds nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, RawValue::Empty)
    }

    /// Cell content as text, `None` for empty cells.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Empty => None,
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Number(n) => Some(format_number(*n)),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Empty)
    }
}

/// Render a number without a trailing ".0" for integral values.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

static EMPTY: RawValue = RawValue::Empty;

/// Header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl RawTable {
    /// Create a table; short rows are padded with empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, RawValue::Empty);
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Build a table from string-like headers.
    pub fn from_rows<H: AsRef<str>>(headers: &[H], rows: Vec<Vec<RawValue>>) -> Self {
        Self::new(headers.iter().map(|h| h.as_ref().to_string()).collect(), rows)
    }

    /// Column names.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rows of the table.
    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.rows.iter().map(move |cells| RawRow { table: self, cells })
    }

    /// Copy of the table with trimmed headers and aliases resolved.
    pub fn with_canonical_headers(&self) -> Self {
        Self {
            headers: self.headers.iter().map(|h| canonical_header(h)).collect(),
            rows: self.rows.clone(),
        }
    }

    /// Copy of the table keeping only the rows matching `keep`.
    pub fn filter_rows(&self, mut keep: impl FnMut(&RawRow<'_>) -> bool) -> Self {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    table: &'a RawTable,
    cells: &'a [RawValue],
}

impl<'a> RawRow<'a> {
    /// Cell under the named column; empty when the column is absent.
    pub fn get(&self, column: &str) -> &'a RawValue {
        self.table
            .column_index(column)
            .and_then(|idx| self.cells.get(idx))
            .unwrap_or(&EMPTY)
    }

    /// Cell at a column position.
    pub fn at(&self, idx: usize) -> &'a RawValue {
        self.cells.get(idx).unwrap_or(&EMPTY)
    }

    /// Text content of the named column.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column).as_text()
    }

    /// All cells of the row.
    pub fn cells(&self) -> &'a [RawValue] {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::from_rows(
            &[" Isin ", "IA_Offer_Price", "Dealer"],
            vec![
                vec!["XS1".into(), 101.5.into(), "GS".into()],
                vec!["XS2".into()],
            ],
        )
    }

    #[test]
    fn test_padding_and_lookup() {
        let t = table();
        assert_eq!(t.len(), 2);
        let second = t.rows().nth(1).unwrap();
        assert!(second.get("Dealer").is_empty());
        assert!(second.get("Unknown").is_empty());
    }

    #[test]
    fn test_canonical_headers() {
        let t = table().with_canonical_headers();
        assert_eq!(t.headers(), &["ISIN", "AXE_Offer_Price", "Dealer"]);
        let first = t.rows().next().unwrap();
        assert_eq!(first.text("ISIN").as_deref(), Some("XS1"));
        assert_eq!(first.get("AXE_Offer_Price"), &RawValue::Number(101.5));
    }

    #[test]
    fn test_number_text() {
        assert_eq!(RawValue::Number(250.0).as_text().as_deref(), Some("250"));
        assert_eq!(RawValue::Number(3.25).as_text().as_deref(), Some("3.25"));
        assert_eq!(RawValue::Empty.as_text(), None);
    }

    #[test]
    fn test_filter_rows() {
        let t = table().with_canonical_headers();
        let kept = t.filter_rows(|row| row.text("Dealer").is_some());
        assert_eq!(kept.len(), 1);
        assert_eq!(t.len(), 2);
    }
}
