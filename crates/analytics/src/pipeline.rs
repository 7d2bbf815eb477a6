//! Load-and-clean pipeline.
//!
//! Raw runs → [`QuoteNormalizer`] → [`select_best`], packaged as an
//! [`AxesSnapshot`]. Source failures surface as `Err` from [`try_load`] and as
//! an empty snapshot from the fail-soft entry points.

use std::path::Path;

use axes_core::config::{CleaningConfig, Config};
use axes_core::{AxesSnapshot, Result};
use axes_ingestion::{QuoteNormalizer, RawTable, WorkbookLoader};
use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::best_quote::select_best;

pub use axes_core::{bucketize, classify_quote, classify_rating};

/// Current local time, the reference for maturity buckets and empty snapshots.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Clean a raw runs table at a given reference time.
pub fn load_and_clean_at(raw: &RawTable, config: &CleaningConfig, now: NaiveDateTime) -> AxesSnapshot {
    let cleaned = QuoteNormalizer::new(config.clone()).normalize(raw, now);
    let best = select_best(&cleaned.quotes);
    AxesSnapshot {
        full_axes: cleaned.quotes,
        best,
        last_import: cleaned.last_import,
    }
}

/// Clean a raw runs table: `(full_axes, best, last_import)`.
pub fn load_and_clean(raw: &RawTable, config: &CleaningConfig) -> AxesSnapshot {
    load_and_clean_at(raw, config, now())
}

/// Read the configured runs sheet through `loader` and clean it.
pub fn try_load(loader: &mut WorkbookLoader, config: &Config, now: NaiveDateTime) -> Result<AxesSnapshot> {
    let raw = loader.load_sheet(&config.source.workbook, &config.source.quotes_sheet)?;
    let snapshot = load_and_clean_at(&raw, &config.cleaning, now);
    info!(
        quotes = snapshot.full_axes.len(),
        best = snapshot.best.len(),
        last_import = %snapshot.last_import,
        "axes snapshot loaded"
    );
    Ok(snapshot)
}

/// Fail-soft load of the runs sheet of `path`.
///
/// A missing or unreadable workbook is logged and yields an empty snapshot.
pub fn load_and_clean_path(path: impl AsRef<Path>, config: &Config) -> AxesSnapshot {
    let mut config = config.clone();
    config.source.workbook = path.as_ref().to_path_buf();
    let now = now();
    match try_load(&mut WorkbookLoader::new(), &config, now) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(path = %config.source.workbook.display(), error = %e, "cannot load axes");
            AxesSnapshot::empty(now)
        }
    }
}
