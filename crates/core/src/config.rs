//! Configuration structures for the axes dashboard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Price gap between AXE and stream figures above which the stream figures win.
pub const STREAM_DIVERGENCE_THRESHOLD: f64 = 10.0;
/// Yield minus price above which price and yield are assumed swapped.
pub const SWAP_DETECTION_THRESHOLD: f64 = 30.0;
/// Highest accepted offer price.
pub const MAX_OFFER_PRICE: f64 = 150.0;
/// Highest accepted offer yield.
pub const MAX_OFFER_YIELD: f64 = 70.0;
/// Raw quantities are quoted in thousands.
pub const QUANTITY_SCALE: f64 = 1000.0;
/// Margin added to the widest composite gap for the default tolerance.
pub const COMPOSITE_TOLERANCE_MARGIN: f64 = 0.1;
/// Upper cap of the default composite tolerance.
pub const COMPOSITE_TOLERANCE_CAP: f64 = 5.0;

/// Curated export column order.
pub const EXPORT_COLUMNS: [&str; 13] = [
    "Bond ID",
    "Sub_Sector",
    "ISIN",
    "Currency",
    "Maturity",
    "Composite_Offer_Price",
    "AXE_Offer_Price",
    "AXE_Offer_YLD",
    "AXE_Offer_BMK_SPD",
    "AXE_Offer_I-SPD",
    "FitchRating",
    "Moody's_rating",
    "Rating_Category",
];

/// Main configuration for the dashboard core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source workbook configuration.
    pub source: SourceConfig,
    /// Quote cleaning configuration.
    pub cleaning: CleaningConfig,
    /// Axe filter defaults.
    pub filter: FilterConfig,
    /// Workbook export configuration.
    pub export: ExportConfig,
}

impl Config {
    /// Parse a configuration from JSON. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check that thresholds and dates are coherent.
    pub fn validate(&self) -> Result<()> {
        let c = &self.cleaning;
        if c.max_offer_price <= 0.0 || c.max_offer_yield <= 0.0 {
            return Err(Error::config("price and yield caps must be positive"));
        }
        if c.stream_divergence_threshold <= 0.0 || c.swap_detection_threshold <= 0.0 {
            return Err(Error::config("repair thresholds must be positive"));
        }
        if c.quantity_scale <= 0.0 {
            return Err(Error::config("quantity scale must be positive"));
        }
        if c.maturity_sentinel >= c.maturity_limit {
            return Err(Error::config(format!(
                "maturity sentinel {} must precede the limit {}",
                c.maturity_sentinel, c.maturity_limit
            )));
        }
        if self.filter.composite_tolerance_cap < 0.0 {
            return Err(Error::config("composite tolerance cap must not be negative"));
        }
        if self.export.start_row == 0 {
            return Err(Error::config("export rows are 1-based"));
        }
        if self.export.columns.is_empty() {
            return Err(Error::config("export needs at least one column"));
        }
        Ok(())
    }
}

/// Source workbook location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Workbook holding quotes and trades.
    pub workbook: PathBuf,
    /// Sheet with the raw dealer runs.
    pub quotes_sheet: String,
    /// Sheet with the raw portfolio trades.
    pub trades_sheet: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("BDD_axes.xlsx"),
            quotes_sheet: "Runs".to_string(),
            trades_sheet: "Portfolio".to_string(),
        }
    }
}

/// Quote cleaning thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// |AXE price - stream price| above which stream figures win.
    pub stream_divergence_threshold: f64,
    /// (yield - price) above which the two are swapped back.
    pub swap_detection_threshold: f64,
    /// Highest accepted offer price (inclusive).
    pub max_offer_price: f64,
    /// Highest accepted offer yield (inclusive).
    pub max_offer_yield: f64,
    /// Multiplier applied to raw quantities.
    pub quantity_scale: f64,
    /// Maturities after this date are treated as unknown.
    pub maturity_limit: NaiveDate,
    /// Replacement for unknown or out-of-range maturities.
    pub maturity_sentinel: NaiveDate,
    /// Decimals kept on price-like fields.
    pub price_decimals: u32,
    /// Decimals kept on spread fields.
    pub spread_decimals: u32,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            stream_divergence_threshold: STREAM_DIVERGENCE_THRESHOLD,
            swap_detection_threshold: SWAP_DETECTION_THRESHOLD,
            max_offer_price: MAX_OFFER_PRICE,
            max_offer_yield: MAX_OFFER_YIELD,
            quantity_scale: QUANTITY_SCALE,
            maturity_limit: NaiveDate::from_ymd_opt(2100, 1, 1).unwrap_or(NaiveDate::MAX),
            maturity_sentinel: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or(NaiveDate::MAX),
            price_decimals: 2,
            spread_decimals: 0,
        }
    }
}

/// Defaults for the interactive axe filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Added to the widest composite bid/offer gap.
    pub composite_tolerance_margin: f64,
    /// Cap on the default composite tolerance.
    pub composite_tolerance_cap: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            composite_tolerance_margin: COMPOSITE_TOLERANCE_MARGIN,
            composite_tolerance_cap: COMPOSITE_TOLERANCE_CAP,
        }
    }
}

/// Workbook export layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Template workbook; a blank workbook is used when absent.
    pub template: Option<PathBuf>,
    /// First data row (1-based), below the template's header rows.
    pub start_row: u32,
    /// Columns written, in order.
    pub columns: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            template: None,
            start_row: 3,
            columns: EXPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}
