//! Cross-reference of best quotes against an imported watchlist.

use axes_core::BestQuote;
use axes_ingestion::Watchlist;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifier the watchlist is matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrossMode {
    #[default]
    Isin,
    Ticker,
}

fn isin_of(best: &BestQuote) -> Option<&str> {
    best.quote.isin.as_deref()
}

fn ticker_of(best: &BestQuote) -> Option<&str> {
    best.quote.ticker.as_deref()
}

/// Best quotes whose ISIN (or ticker) appears in the watchlist.
///
/// No match is a normal, empty result.
pub fn cross_reference(best: &[BestQuote], watchlist: &Watchlist, mode: CrossMode) -> Vec<BestQuote> {
    let (keys, field) = match mode {
        CrossMode::Isin => (&watchlist.isins, isin_of as fn(&BestQuote) -> Option<&str>),
        CrossMode::Ticker => (&watchlist.tickers, ticker_of as fn(&BestQuote) -> Option<&str>),
    };
    let matched: Vec<BestQuote> = best
        .iter()
        .filter(|b| field(b).is_some_and(|v| keys.contains(v.trim())))
        .cloned()
        .collect();
    debug!(?mode, watched = keys.len(), matched = matched.len(), "cross-referenced watchlist");
    matched
}
