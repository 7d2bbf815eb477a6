//! Workbook export of quotes.
//!
//! Rows are written below the template's header block, one column per
//! configured name. Columns a row type does not know are skipped and the
//! remaining ones close up, so the written layout is the configured order
//! restricted to known columns.

use std::path::Path;

use axes_core::config::ExportConfig;
use axes_core::{BestQuote, Error, Quote, Result};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;
use umya_spreadsheet::Spreadsheet;

use crate::columns as col;
use crate::table::{RawTable, RawValue};
use crate::workbook::{open_workbook, sheet_rows};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single exported cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportValue {
    Empty,
    Number(f64),
    Text(String),
}

impl ExportValue {
    fn text(value: Option<&str>) -> Self {
        value.map_or(ExportValue::Empty, |s| ExportValue::Text(s.to_string()))
    }

    fn number(value: Option<f64>) -> Self {
        value.map_or(ExportValue::Empty, ExportValue::Number)
    }

    fn date(value: NaiveDate) -> Self {
        ExportValue::Text(value.format(DATE_FORMAT).to_string())
    }

    fn datetime(value: NaiveDateTime) -> Self {
        ExportValue::Text(value.format(DATETIME_FORMAT).to_string())
    }
}

impl From<ExportValue> for RawValue {
    fn from(value: ExportValue) -> Self {
        match value {
            ExportValue::Empty => RawValue::Empty,
            ExportValue::Number(n) => RawValue::Number(n),
            ExportValue::Text(s) => RawValue::Text(s),
        }
    }
}

/// A record that can be laid out as a spreadsheet row.
pub trait ExportRow {
    /// Value under a column name, `None` when the record has no such column.
    fn export_value(&self, column: &str) -> Option<ExportValue>;
}

impl ExportRow for Quote {
    fn export_value(&self, column: &str) -> Option<ExportValue> {
        let value = match column {
            col::IMPORT_DATETIME => ExportValue::datetime(self.import_datetime),
            col::ISIN => ExportValue::text(self.isin.as_deref()),
            col::DEALER => ExportValue::text(self.dealer.as_deref()),
            col::ISSUER_NAME => ExportValue::text(self.issuer_name.as_deref()),
            col::BOND_ID => ExportValue::text(self.bond_id.as_deref()),
            // The source format carries the raw sub-sector under "Sector".
            col::SECTOR => ExportValue::text(self.sub_sector.as_deref()),
            col::SUB_SECTOR => ExportValue::text(self.sub_sector.as_deref()),
            col::TICKER => ExportValue::text(self.ticker.as_deref()),
            col::CURRENCY => ExportValue::text(self.currency.as_deref()),
            col::COUPON => ExportValue::number(self.coupon),
            col::COUPON_TYPE => ExportValue::text(self.coupon_type.as_deref()),
            col::MATURITY => ExportValue::date(self.maturity),
            col::FITCH_RATING => ExportValue::text(self.fitch_rating.as_deref()),
            col::MOODYS_RATING => ExportValue::text(self.moodys_rating.as_deref()),
            col::OFFER_PRICE => ExportValue::Number(self.offer_price),
            col::OFFER_YIELD => ExportValue::Number(self.offer_yield),
            col::OFFER_QTY => ExportValue::Number(self.offer_qty),
            col::BMK_SPREAD => ExportValue::number(self.bmk_spread),
            col::I_SPREAD => ExportValue::number(self.i_spread),
            col::Z_SPREAD => ExportValue::number(self.z_spread),
            col::ASW => ExportValue::number(self.asw),
            col::STREAM_OFFER_PRICE => ExportValue::number(self.stream_offer_price),
            col::STREAM_OFFER_YIELD => ExportValue::number(self.stream_offer_yield),
            col::COMPOSITE_BID_PRICE => ExportValue::number(self.composite_bid_price),
            col::COMPOSITE_OFFER_PRICE => ExportValue::number(self.composite_offer_price),
            col::MID_PRICE => ExportValue::number(self.mid_price),
            col::AXE_MID_SPREAD => ExportValue::number(self.axe_mid_spread),
            col::RATING_CATEGORY => ExportValue::Text(self.rating_category.label().to_string()),
            _ => return None,
        };
        Some(value)
    }
}

impl ExportRow for BestQuote {
    fn export_value(&self, column: &str) -> Option<ExportValue> {
        match column {
            col::BEST_DEALER => Some(ExportValue::text(self.best_dealer())),
            col::NB_DEALERS_AXE => Some(ExportValue::Number(f64::from(self.nb_dealers_axe))),
            col::DEALER => None,
            // Sector on a best quote is the derived one, as displayed.
            col::SECTOR => Some(ExportValue::text(self.quote.sector.as_deref())),
            other => self.quote.export_value(other),
        }
    }
}

/// Configured columns the rows actually provide, in configured order.
pub fn exportable_columns<R: ExportRow>(rows: &[R], columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| rows.first().map_or(true, |row| row.export_value(c).is_some()))
        .cloned()
        .collect()
}

/// Lay rows out as a raw table under the given columns.
pub fn to_raw_table<R: ExportRow, C: AsRef<str>>(rows: &[R], columns: &[C]) -> RawTable {
    let data = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.export_value(c.as_ref()).map_or(RawValue::Empty, RawValue::from))
                .collect()
        })
        .collect();
    RawTable::from_rows(columns, data)
}

fn base_workbook(config: &ExportConfig) -> Result<Spreadsheet> {
    match &config.template {
        Some(template) => open_workbook(template)
            .map_err(|e| Error::export(format!("template unusable: {e}"))),
        None => Ok(umya_spreadsheet::new_file()),
    }
}

/// Write rows into a copy of the template and save it to `path`.
///
/// The first sheet is renamed to `sheet_name`. Returns the columns written.
pub fn export_rows<R: ExportRow>(
    rows: &[R],
    config: &ExportConfig,
    path: impl AsRef<Path>,
    sheet_name: &str,
) -> Result<Vec<String>> {
    let path = path.as_ref();
    let columns = exportable_columns(rows, &config.columns);
    let mut book = base_workbook(config)?;
    let ws = book
        .get_sheet_mut(&0)
        .ok_or_else(|| Error::export("workbook has no sheet"))?;
    ws.set_name(sheet_name);

    for (i, row) in rows.iter().enumerate() {
        let r = config.start_row + i as u32;
        for (j, column) in columns.iter().enumerate() {
            let cell = ws.get_cell_mut((j as u32 + 1, r));
            match row.export_value(column) {
                Some(ExportValue::Number(n)) => {
                    cell.set_value_number(n);
                }
                Some(ExportValue::Text(s)) => {
                    cell.set_value(s);
                }
                Some(ExportValue::Empty) | None => {}
            }
        }
    }

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| Error::export(format!("cannot write {}: {e}", path.display())))?;
    info!(path = %path.display(), sheet = sheet_name, rows = rows.len(), columns = columns.len(), "exported workbook");
    Ok(columns)
}

/// Read an exported sheet back, naming columns after `columns`.
pub fn read_export(
    path: impl AsRef<Path>,
    sheet: &str,
    config: &ExportConfig,
    columns: &[String],
) -> Result<RawTable> {
    let path = path.as_ref();
    let book = open_workbook(path)?;
    let ws = book
        .get_sheet_by_name(sheet)
        .ok_or_else(|| Error::missing_sheet(sheet))?;
    let rows = sheet_rows(ws, config.start_row)
        .into_iter()
        .map(|mut cells| {
            cells.resize(columns.len(), RawValue::Empty);
            cells
        })
        .collect();
    Ok(RawTable::from_rows(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::{to_date, to_number};
    use approx::assert_relative_eq;
    use axes_core::RatingCategory;
    use tempfile::tempdir;

    fn best_quotes() -> Vec<BestQuote> {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let maturity = NaiveDate::from_ymd_opt(2030, 6, 15).unwrap();
        let mut a = Quote::new("XS1", "GS", 99.46, 4.12, 1_500_000.0, maturity, ts);
        a.bond_id = Some("ACME 4 1/8 06/30".to_string());
        a.sub_sector = Some("HY-Telecom".to_string());
        a.currency = Some("EUR".to_string());
        a.composite_offer_price = Some(99.9);
        a.bmk_spread = Some(188.0);
        a.fitch_rating = Some("BB+".to_string());
        a.rating_category = RatingCategory::Crossover;
        let b = Quote::new("XS2", "JPM", 101.0, 3.5, 500_000.0, maturity, ts);
        vec![
            BestQuote { quote: a, nb_dealers_axe: 3 },
            BestQuote { quote: b, nb_dealers_axe: 1 },
        ]
    }

    #[test]
    fn test_round_trip_export_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Axes_export.xlsx");
        let config = ExportConfig::default();
        let best = best_quotes();

        let columns = export_rows(&best, &config, &path, "Axes").unwrap();
        assert_eq!(columns, config.columns);

        let table = read_export(&path, "Axes", &config, &columns).unwrap();
        assert_eq!(table.len(), best.len());

        for (row, expected) in table.rows().zip(&best) {
            for column in &columns {
                let got = row.get(column);
                match expected.export_value(column).unwrap() {
                    ExportValue::Empty => assert!(got.is_empty(), "{column}"),
                    ExportValue::Number(n) => assert_relative_eq!(to_number(got).unwrap(), n),
                    ExportValue::Text(s) => assert_eq!(got.as_text().unwrap(), s, "{column}"),
                }
            }
        }
        let first = table.rows().next().unwrap();
        assert_eq!(to_date(first.get("Maturity")), NaiveDate::from_ymd_opt(2030, 6, 15));
    }

    #[test]
    fn test_writes_from_start_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let config = ExportConfig::default();
        export_rows(&best_quotes(), &config, &path, "Axes croisés").unwrap();

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let ws = book.get_sheet_by_name("Axes croisés").unwrap();
        assert_eq!(ws.get_value((1, 1)), "");
        assert_eq!(ws.get_value((1, 2)), "");
        assert_eq!(ws.get_value((1, 3)), "ACME 4 1/8 06/30");
        assert_eq!(ws.get_value((3, 4)), "XS2");
    }

    #[test]
    fn test_missing_template() {
        let dir = tempdir().unwrap();
        let config = ExportConfig {
            template: Some(dir.path().join("template.xlsx")),
            ..ExportConfig::default()
        };
        let err = export_rows(&best_quotes(), &config, dir.path().join("o.xlsx"), "Axes");
        assert!(matches!(err, Err(Error::Export(_))));
    }

    #[test]
    fn test_unknown_columns_are_skipped() {
        let columns = vec!["ISIN".to_string(), "Bogus".to_string(), "Best_Dealer".to_string()];
        let best = best_quotes();
        assert_eq!(exportable_columns(&best, &columns), vec!["ISIN", "Best_Dealer"]);

        let quotes: Vec<Quote> = best.into_iter().map(|b| b.quote).collect();
        assert_eq!(exportable_columns(&quotes, &columns), vec!["ISIN"]);

        let table = to_raw_table(&quotes, &["ISIN", "AXE_Offer_Price"]);
        let first = table.rows().next().unwrap();
        assert_eq!(first.get("AXE_Offer_Price"), &RawValue::Number(99.46));
    }
}
