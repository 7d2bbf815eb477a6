//! User-supplied watchlist of identifiers.

use std::collections::BTreeSet;

use axes_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::table::RawTable;

/// ISINs and tickers imported from a headerless two-column sheet.
///
/// Column A holds ISINs, column B tickers. Values are trimmed and
/// de-duplicated; either set may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watchlist {
    pub isins: BTreeSet<String>,
    pub tickers: BTreeSet<String>,
}

fn column_values(table: &RawTable, idx: usize) -> BTreeSet<String> {
    table
        .rows()
        .filter_map(|row| row.at(idx).as_text())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Watchlist {
    /// Build from a headerless table.
    pub fn from_table(table: &RawTable) -> Result<Self> {
        if table.width() == 0 {
            return Err(Error::data("watchlist file has no column"));
        }
        let isins = column_values(table, 0);
        let tickers = if table.width() > 1 {
            column_values(table, 1)
        } else {
            BTreeSet::new()
        };
        Ok(Self { isins, tickers })
    }

    /// Whether both sets are empty.
    pub fn is_empty(&self) -> bool {
        self.isins.is_empty() && self.tickers.is_empty()
    }
}
