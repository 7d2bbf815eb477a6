//! Interactive axe filters.
//!
//! Qualitative criteria keep rows whose value is in a chosen set; an empty
//! set does not filter. Quantitative ranges are inclusive and inactive until
//! set; an active range drops rows lacking the figure.

use std::collections::BTreeSet;

use axes_core::config::FilterConfig;
use axes_core::{BestQuote, Quote, RatingCategory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Marker of Rule 144A issues in the Bond ID.
const RULE_144A: &str = "144A";

/// Slider bounds over the non-null values; `(0, 1)` when empty or constant.
pub fn slider_range<I>(values: I) -> (f64, f64)
where
    I: IntoIterator<Item = Option<f64>>,
{
    let values: Vec<f64> = values.into_iter().flatten().filter(|v| !v.is_nan()).collect();
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let min = <_ as Statistics<f64>>::min(values.iter());
    let max = <_ as Statistics<f64>>::max(values.iter());
    if min == max {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

/// Default composite tolerance: the widest composite gap plus a margin,
/// capped, rounded to cents. `None` when no quote has a composite range.
pub fn default_tolerance(best: &[BestQuote], config: &FilterConfig) -> Option<f64> {
    let widest = best
        .iter()
        .filter_map(|b| b.quote.composite_gap())
        .fold(None, |acc: Option<f64>, gap| Some(acc.map_or(gap, |m| m.max(gap))))?;
    let tolerance = (widest + config.composite_tolerance_margin).min(config.composite_tolerance_cap);
    Some((tolerance * 100.0).round() / 100.0)
}

/// Distinct values offered by the qualitative selectors, sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub sectors: Vec<String>,
    pub currencies: Vec<String>,
    pub rating_categories: Vec<RatingCategory>,
    pub tickers: Vec<String>,
    pub dealers: Vec<String>,
}

impl FilterOptions {
    /// Collect the choices present in a best-quote set.
    pub fn from_best(best: &[BestQuote]) -> Self {
        fn distinct<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
            values
                .flatten()
                .map(str::to_string)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        }
        Self {
            sectors: distinct(best.iter().map(|b| b.quote.sector.as_deref())),
            currencies: distinct(best.iter().map(|b| b.quote.currency.as_deref())),
            rating_categories: best
                .iter()
                .map(|b| b.quote.rating_category)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            tickers: distinct(best.iter().map(|b| b.quote.ticker.as_deref())),
            dealers: distinct(best.iter().map(BestQuote::best_dealer)),
        }
    }
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether a present value lies within the bounds.
    pub fn admits(&self, value: Option<f64>) -> bool {
        value.is_some_and(|v| v >= self.min && v <= self.max)
    }
}

/// Axe filter criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxeFilter {
    pub sectors: BTreeSet<String>,
    pub currencies: BTreeSet<String>,
    pub rating_categories: BTreeSet<RatingCategory>,
    pub tickers: BTreeSet<String>,
    /// Best dealer for best quotes, quoting dealer for raw quotes.
    pub dealers: BTreeSet<String>,
    pub yield_range: Option<Range>,
    pub bmk_spread_range: Option<Range>,
    /// Applies to best quotes only.
    pub dealer_count_range: Option<Range>,
    pub quantity_range: Option<Range>,
    pub axe_mid_range: Option<Range>,
    pub maturity_range: Option<(NaiveDate, NaiveDate)>,
    pub exclude_144a: bool,
    /// Accepted distance outside the composite bid/offer. Rows without a
    /// composite range are dropped when set.
    pub composite_tolerance: Option<f64>,
}

fn in_set(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    set.is_empty() || value.is_some_and(|v| set.contains(v))
}

impl AxeFilter {
    /// Filter that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no criterion is set.
    pub fn is_inactive(&self) -> bool {
        *self == Self::default()
    }

    fn admits(&self, quote: &Quote, dealer_count: Option<u32>) -> bool {
        if !in_set(&self.sectors, quote.sector.as_deref())
            || !in_set(&self.currencies, quote.currency.as_deref())
            || !in_set(&self.tickers, quote.ticker.as_deref())
            || !in_set(&self.dealers, quote.dealer.as_deref())
        {
            return false;
        }
        if !self.rating_categories.is_empty()
            && !self.rating_categories.contains(&quote.rating_category)
        {
            return false;
        }

        let ranges = [
            (self.yield_range, Some(quote.offer_yield)),
            (self.bmk_spread_range, quote.bmk_spread),
            (self.quantity_range, Some(quote.offer_qty)),
            (self.axe_mid_range, quote.axe_mid_spread),
        ];
        if ranges
            .iter()
            .any(|(range, value)| range.is_some_and(|r| !r.admits(*value)))
        {
            return false;
        }
        if let (Some(range), Some(count)) = (self.dealer_count_range, dealer_count) {
            if !range.admits(Some(f64::from(count))) {
                return false;
            }
        }
        if let Some((from, to)) = self.maturity_range {
            if quote.maturity < from || quote.maturity > to {
                return false;
            }
        }

        if self.exclude_144a && quote.bond_id.as_deref().is_some_and(|id| id.contains(RULE_144A)) {
            return false;
        }

        match self.composite_tolerance {
            None => true,
            Some(tol) => match (quote.composite_bid_price, quote.composite_offer_price) {
                (Some(bid), Some(offer)) => {
                    quote.offer_price >= bid - tol && quote.offer_price <= offer + tol
                }
                _ => false,
            },
        }
    }

    /// Best quotes passing every criterion.
    pub fn apply_to_best(&self, best: &[BestQuote]) -> Vec<BestQuote> {
        best.iter()
            .filter(|b| self.admits(&b.quote, Some(b.nb_dealers_axe)))
            .cloned()
            .collect()
    }

    /// Raw quotes passing every criterion except the dealer count.
    pub fn apply_to_quotes(&self, quotes: &[Quote]) -> Vec<Quote> {
        quotes
            .iter()
            .filter(|q| self.admits(q, None))
            .cloned()
            .collect()
    }
}
