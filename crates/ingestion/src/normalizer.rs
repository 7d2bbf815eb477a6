//! Quote normalization.
//!
//! Turns a raw "Runs" sheet into typed, cleaned [`Quote`]s of the most recent
//! import batch. Steps run in a fixed order because later repairs depend on
//! earlier coercions:
//!
//! 1. canonical headers
//! 2. batch timestamp parse, 3. latest batch only
//! 4-6. quantity / yield / price coercion
//! 7. stream reconciliation, 8. price/yield swap repair
//! 9. validity filter
//! 10. composite prices, 11. maturity cap, 12. rounding
//! 13. sector split, 14. rating category
//!
//! Malformed rows are dropped silently; nothing here returns an error.

use axes_core::config::CleaningConfig;
use axes_core::{classify_rating, Quote, RatingCategory};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::coerce::{
    round_to, to_date, to_datetime, to_decimal, to_number, to_quantity, to_spaced_decimal,
    to_text,
};
use crate::columns as col;
use crate::table::{RawRow, RawTable};

/// Sub-sector markers of financial subordinated or senior bank debt.
const IG_FIN_MARKERS: [&str; 4] = ["CoCo", "Lower Tier", "Upper T2", "SnBnk"];

/// Output of the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedQuotes {
    /// Cleaned quotes of the latest batch, in source order.
    pub quotes: Vec<Quote>,
    /// Timestamp of the retained batch, or `now` when nothing was retained.
    pub last_import: NaiveDateTime,
}

/// Where the composite bid/offer figures come from, if anywhere.
#[derive(Debug, Clone, Copy)]
struct CompositeSource {
    offer: &'static str,
    bid: &'static str,
}

impl CompositeSource {
    fn detect(table: &RawTable) -> Option<Self> {
        [
            (col::TW_OFFER_PRICE, col::TW_BID_PRICE),
            (col::COMPOSITE_OFFER_PRICE, col::COMPOSITE_BID_PRICE),
        ]
        .into_iter()
        .find(|(offer, bid)| table.has_column(offer) && table.has_column(bid))
        .map(|(offer, bid)| CompositeSource { offer, bid })
    }
}

/// Figures of one row while the repairs run.
#[derive(Debug, Clone, Copy)]
struct OfferFigures {
    price: Option<f64>,
    yield_: Option<f64>,
    qty: Option<f64>,
}

/// Cleans raw dealer runs.
#[derive(Debug, Clone, Default)]
pub struct QuoteNormalizer {
    config: CleaningConfig,
}

impl QuoteNormalizer {
    /// Create a normalizer with the given thresholds.
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a raw table. `now` stamps the result when no batch survives.
    pub fn normalize(&self, raw: &RawTable, now: NaiveDateTime) -> CleanedQuotes {
        let table = raw.with_canonical_headers();

        if !table.has_column(col::IMPORT_DATETIME) {
            warn!(column = col::IMPORT_DATETIME, "runs sheet has no import timestamp column");
            return CleanedQuotes { quotes: Vec::new(), last_import: now };
        }

        let stamped: Vec<(RawRow<'_>, NaiveDateTime)> = table
            .rows()
            .filter_map(|row| to_datetime(row.get(col::IMPORT_DATETIME)).map(|ts| (row, ts)))
            .collect();

        let Some(last_import) = stamped.iter().map(|(_, ts)| *ts).max() else {
            warn!(rows = table.len(), "no parseable import timestamp");
            return CleanedQuotes { quotes: Vec::new(), last_import: now };
        };

        let latest: Vec<RawRow<'_>> = stamped
            .into_iter()
            .filter(|(_, ts)| *ts == last_import)
            .map(|(row, _)| row)
            .collect();
        debug!(rows = table.len(), retained = latest.len(), %last_import, "kept latest import batch");

        let has_stream = table.has_column(col::STREAM_OFFER_PRICE)
            && table.has_column(col::STREAM_OFFER_YIELD);
        let composite = CompositeSource::detect(&table);

        let mut repaired_stream = 0usize;
        let mut repaired_swap = 0usize;
        let quotes: Vec<Quote> = latest
            .iter()
            .filter_map(|row| {
                let (quote, stream_fix, swap_fix) =
                    self.clean_row(row, last_import, has_stream, composite)?;
                repaired_stream += usize::from(stream_fix);
                repaired_swap += usize::from(swap_fix);
                Some(quote)
            })
            .collect();

        info!(
            retained = quotes.len(),
            dropped = latest.len() - quotes.len(),
            repaired_stream,
            repaired_swap,
            %last_import,
            "normalized dealer runs"
        );

        CleanedQuotes { quotes, last_import }
    }

    /// Clean one row. Returns the quote and which repairs fired.
    fn clean_row(
        &self,
        row: &RawRow<'_>,
        import_datetime: NaiveDateTime,
        has_stream: bool,
        composite: Option<CompositeSource>,
    ) -> Option<(Quote, bool, bool)> {
        let mut figures = OfferFigures {
            price: to_number(row.get(col::OFFER_PRICE)),
            yield_: to_decimal(row.get(col::OFFER_YIELD)).map(f64::abs),
            qty: to_quantity(row.get(col::OFFER_QTY)).map(|q| q * self.config.quantity_scale),
        };

        let (stream_price, stream_yield) = if has_stream {
            (
                to_spaced_decimal(row.get(col::STREAM_OFFER_PRICE)),
                to_decimal(row.get(col::STREAM_OFFER_YIELD)),
            )
        } else {
            (None, None)
        };

        let stream_fix = self.reconcile_stream(&mut figures, stream_price, stream_yield);
        let swap_fix = self.repair_swap(&mut figures, stream_price);

        let (price, yield_, qty) = self.validate(figures)?;

        let (composite_bid, composite_offer) = match composite {
            Some(source) => (to_number(row.get(source.bid)), to_number(row.get(source.offer))),
            None => (None, None),
        };
        let mid = match (composite_offer, composite_bid) {
            (Some(offer), Some(bid)) => Some((offer + bid) / 2.0),
            _ => None,
        };
        let axe_mid_spread = mid.map(|m| price - m);

        let maturity = self.cap_maturity(to_date(row.get(col::MATURITY)));

        let raw_sector = to_text(row.get(col::SECTOR));
        let sector = raw_sector.as_deref().and_then(derive_sector);

        let fitch_rating = row.text(col::FITCH_RATING);
        let moodys_rating = row.text(col::MOODYS_RATING);
        let rating_category: RatingCategory =
            classify_rating(fitch_rating.as_deref(), moodys_rating.as_deref());

        let p = self.config.price_decimals;
        let s = self.config.spread_decimals;
        let round_price = |v: Option<f64>| v.map(|x| round_to(x, p));
        let round_spread = |v: Option<f64>| v.map(|x| round_to(x, s));

        let quote = Quote {
            isin: to_text(row.get(col::ISIN)),
            dealer: to_text(row.get(col::DEALER)),
            issuer_name: to_text(row.get(col::ISSUER_NAME)),
            bond_id: to_text(row.get(col::BOND_ID)),
            sector,
            sub_sector: raw_sector,
            ticker: to_text(row.get(col::TICKER)),
            currency: to_text(row.get(col::CURRENCY)),
            coupon: to_decimal(row.get(col::COUPON)),
            coupon_type: to_text(row.get(col::COUPON_TYPE)),
            maturity,
            fitch_rating,
            moodys_rating,
            offer_price: round_to(price, p),
            offer_yield: round_to(yield_, p),
            offer_qty: round_to(qty, p),
            bmk_spread: round_spread(to_number(row.get(col::BMK_SPREAD))),
            i_spread: round_spread(to_number(row.get(col::I_SPREAD))),
            z_spread: round_spread(to_number(row.get(col::Z_SPREAD))),
            asw: round_spread(to_number(row.get(col::ASW))),
            stream_offer_price: stream_price,
            stream_offer_yield: stream_yield,
            composite_bid_price: round_price(composite_bid),
            composite_offer_price: round_price(composite_offer),
            mid_price: round_price(mid),
            axe_mid_spread: round_price(axe_mid_spread),
            rating_category,
            import_datetime,
        };
        Some((quote, stream_fix, swap_fix))
    }

    /// Replace AXE figures by the stream figures when the prices diverge.
    fn reconcile_stream(
        &self,
        figures: &mut OfferFigures,
        stream_price: Option<f64>,
        stream_yield: Option<f64>,
    ) -> bool {
        let (Some(sp), Some(sy), Some(price), Some(_)) =
            (stream_price, stream_yield, figures.price, figures.yield_)
        else {
            return false;
        };
        if (price - sp).abs() > self.config.stream_divergence_threshold {
            figures.price = Some(sp);
            figures.yield_ = Some(sy.abs());
            return true;
        }
        false
    }

    /// Swap price and yield back when the yield is implausibly above the price.
    fn repair_swap(&self, figures: &mut OfferFigures, stream_price: Option<f64>) -> bool {
        if stream_price.is_some() {
            return false;
        }
        let (Some(price), Some(yield_)) = (figures.price, figures.yield_) else {
            return false;
        };
        if yield_ - price > self.config.swap_detection_threshold {
            figures.price = Some(yield_);
            figures.yield_ = Some(price);
            return true;
        }
        false
    }

    /// Keep rows with a usable price, yield and quantity.
    ///
    /// A price that rounds to zero at the displayed precision is no price.
    fn validate(&self, figures: OfferFigures) -> Option<(f64, f64, f64)> {
        let price = figures.price?;
        let yield_ = figures.yield_?;
        let qty = figures.qty?;
        if round_to(price, self.config.price_decimals) == 0.0
            || price > self.config.max_offer_price
            || yield_ > self.config.max_offer_yield
        {
            return None;
        }
        Some((price, yield_, qty))
    }

    /// Unknown or far-dated maturities become the sentinel date.
    fn cap_maturity(&self, maturity: Option<NaiveDate>) -> NaiveDate {
        match maturity {
            Some(m) if m <= self.config.maturity_limit => m,
            _ => self.config.maturity_sentinel,
        }
    }
}

/// Sector from a raw sub-sector string.
///
/// The leading token before a space or hyphen, except that IG names are
/// grouped into "IG FIN" (bank capital and senior bank paper) or "IG CORPO".
pub fn derive_sector(sub_sector: &str) -> Option<String> {
    if sub_sector.starts_with("IG") {
        let is_fin = IG_FIN_MARKERS.iter().any(|m| sub_sector.contains(m));
        return Some(if is_fin { "IG FIN" } else { "IG CORPO" }.to_string());
    }
    let token: String = sub_sector
        .chars()
        .take_while(|c| *c != ' ' && *c != '-')
        .collect();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawValue;
    use approx::assert_relative_eq;

    const BATCH: &str = "2024-03-01 09:30:00";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    const HEADERS: [&str; 9] = [
        "ImportDateTime",
        "Isin",
        "Dealer",
        "IA_Offer_Price",
        "IA_Offer_YLD",
        "IA_Offer_QTY",
        "Maturity",
        "Sector",
        "Fitch rating",
    ];

    fn row(ts: &str, isin: &str, price: &str, yld: &str, qty: &str) -> Vec<RawValue> {
        vec![
            ts.into(),
            isin.into(),
            "GS".into(),
            price.into(),
            yld.into(),
            qty.into(),
            "2030-06-15".into(),
            "IG - SnBnk/Fin".into(),
            "BBB".into(),
        ]
    }

    fn normalize(rows: Vec<Vec<RawValue>>) -> CleanedQuotes {
        QuoteNormalizer::default().normalize(&RawTable::from_rows(&HEADERS, rows), now())
    }

    #[test]
    fn test_basic_cleaning() {
        let cleaned = normalize(vec![row(BATCH, "XS1", "99.456", "-4,125%", "1 500")]);
        assert_eq!(cleaned.quotes.len(), 1);
        let q = &cleaned.quotes[0];
        assert_eq!(q.isin.as_deref(), Some("XS1"));
        assert_relative_eq!(q.offer_price, 99.46);
        assert_relative_eq!(q.offer_yield, 4.12);
        assert_relative_eq!(q.offer_qty, 1_500_000.0);
        assert_eq!(q.sector.as_deref(), Some("IG FIN"));
        assert_eq!(q.sub_sector.as_deref(), Some("IG - SnBnk/Fin"));
        assert_eq!(q.rating_category, RatingCategory::Crossover);
        assert_eq!(q.composite_bid_price, None);
        assert_eq!(q.axe_mid_spread, None);
    }

    #[test]
    fn test_keeps_latest_batch_only() {
        let cleaned = normalize(vec![
            row("2024-02-28 09:00:00", "OLD", "99", "4", "100"),
            row(BATCH, "NEW1", "99", "4", "100"),
            row("not a date", "BAD", "99", "4", "100"),
            row(BATCH, "NEW2", "98", "4.5", "100"),
        ]);
        let isins: Vec<_> = cleaned.quotes.iter().filter_map(|q| q.isin.clone()).collect();
        assert_eq!(isins, vec!["NEW1", "NEW2"]);
        assert_eq!(cleaned.last_import.to_string(), "2024-03-01 09:30:00");
    }

    #[test]
    fn test_no_timestamp_is_empty() {
        let cleaned = normalize(vec![row("", "XS1", "99", "4", "100")]);
        assert!(cleaned.quotes.is_empty());
        assert_eq!(cleaned.last_import, now());

        let table = RawTable::from_rows(&["Isin"], vec![vec!["XS1".into()]]);
        let cleaned = QuoteNormalizer::default().normalize(&table, now());
        assert!(cleaned.quotes.is_empty());
    }

    #[test]
    fn test_validity_bounds() {
        let cleaned = normalize(vec![
            row(BATCH, "ZERO", "0", "4", "100"),
            row(BATCH, "HIGH", "150.01", "4", "100"),
            row(BATCH, "CAP", "150", "70", "100"),
            row(BATCH, "YLD", "99", "70.5", "100"),
            row(BATCH, "NOQTY", "99", "4", "n/a"),
            row(BATCH, "NOPRICE", "", "4", "100"),
        ]);
        let isins: Vec<_> = cleaned.quotes.iter().filter_map(|q| q.isin.clone()).collect();
        assert_eq!(isins, vec!["CAP"]);
    }

    #[test]
    fn test_yield_is_non_negative() {
        let cleaned = normalize(vec![
            row(BATCH, "A", "99", "-3.5", "100"),
            row(BATCH, "B", "98", "-0", "100"),
        ]);
        assert!(cleaned.quotes.iter().all(|q| q.offer_yield >= 0.0));
    }

    #[test]
    fn test_swap_repair_without_stream() {
        let cleaned = normalize(vec![row(BATCH, "SWAP", "4.2", "98.7", "100")]);
        let q = &cleaned.quotes[0];
        assert_relative_eq!(q.offer_price, 98.7);
        assert_relative_eq!(q.offer_yield, 4.2);
    }

    #[test]
    fn test_stream_reconciliation() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.extend(["Stream_Offer_Price", "Stream_Offer_YLD"]);
        let mut diverging = row(BATCH, "DIV", "85", "9", "100");
        diverging.extend(["97,5".into(), "5.1%".into()]);
        let mut close = row(BATCH, "CLOSE", "96", "5.3", "100");
        close.extend(["97".into(), "5.2".into()]);
        // Stream present: no swap repair even with an absurd yield.
        let mut no_swap = row(BATCH, "NOSWAP", "4.2", "98.7", "100");
        no_swap.extend(["4.3".into(), "".into()]);

        let table = RawTable::from_rows(&headers, vec![diverging, close, no_swap]);
        let cleaned = QuoteNormalizer::default().normalize(&table, now());
        assert_eq!(cleaned.quotes.len(), 2);

        let div = &cleaned.quotes[0];
        assert_relative_eq!(div.offer_price, 97.5);
        assert_relative_eq!(div.offer_yield, 5.1);
        let close = &cleaned.quotes[1];
        assert_relative_eq!(close.offer_price, 96.0);
        assert_relative_eq!(close.offer_yield, 5.3);
    }

    #[test]
    fn test_negative_stream_yield_is_absolute() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.extend(["Stream_Offer_Price", "Stream_Offer_YLD"]);
        let mut diverging = row(BATCH, "DIV", "85", "9", "100");
        diverging.extend(["97.5".into(), "-5.1".into()]);
        let table = RawTable::from_rows(&headers, vec![diverging]);
        let cleaned = QuoteNormalizer::default().normalize(&table, now());
        let q = &cleaned.quotes[0];
        assert_relative_eq!(q.offer_price, 97.5);
        assert_relative_eq!(q.offer_yield, 5.1);
    }

    #[test]
    fn test_swap_repair_with_empty_stream_cell() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.extend(["Stream_Offer_Price", "Stream_Offer_YLD"]);
        let mut r = row(BATCH, "SWAP", "4.2", "98.7", "100");
        r.extend([RawValue::Empty, RawValue::Empty]);
        let table = RawTable::from_rows(&headers, vec![r]);
        let cleaned = QuoteNormalizer::default().normalize(&table, now());
        let q = &cleaned.quotes[0];
        assert_relative_eq!(q.offer_price, 98.7);
        assert_relative_eq!(q.offer_yield, 4.2);
    }

    #[test]
    fn test_price_rounding_to_zero_is_dropped() {
        let cleaned = normalize(vec![
            row(BATCH, "TINY", "0.004", "4", "100"),
            row(BATCH, "SMALL", "0.006", "4", "100"),
        ]);
        let isins: Vec<_> = cleaned.quotes.iter().filter_map(|q| q.isin.clone()).collect();
        assert_eq!(isins, vec!["SMALL"]);
        assert!(cleaned.quotes.iter().all(|q| q.offer_price > 0.0));
    }

    #[test]
    fn test_composite_prices() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.extend(["TW_Offer_Price", "TW_Bid_Price"]);
        let mut r = row(BATCH, "XS1", "99.5", "4", "100");
        r.extend([RawValue::Number(100.0), RawValue::Number(99.0)]);
        let table = RawTable::from_rows(&headers, vec![r]);
        let q = &QuoteNormalizer::default().normalize(&table, now()).quotes[0];
        assert_eq!(q.composite_offer_price, Some(100.0));
        assert_eq!(q.composite_bid_price, Some(99.0));
        assert_eq!(q.mid_price, Some(99.5));
        assert_eq!(q.axe_mid_spread, Some(0.0));
    }

    #[test]
    fn test_maturity_cap() {
        let mut far = row(BATCH, "FAR", "99", "4", "100");
        far[6] = "2150-01-01".into();
        let mut missing = row(BATCH, "NONE", "99", "4", "100");
        missing[6] = RawValue::Empty;
        let mut timed = row(BATCH, "TIMED", "99", "4", "100");
        timed[6] = "2031-05-15 14:00:00".into();
        let cleaned = normalize(vec![far, missing, timed]);
        let sentinel = NaiveDate::from_ymd_opt(2099, 12, 31).unwrap();
        assert_eq!(cleaned.quotes[0].maturity, sentinel);
        assert_eq!(cleaned.quotes[1].maturity, sentinel);
        assert_eq!(cleaned.quotes[2].maturity, NaiveDate::from_ymd_opt(2031, 5, 15).unwrap());
    }

    #[test]
    fn test_spread_rounding() {
        let mut headers: Vec<&str> = HEADERS.to_vec();
        headers.push("IA_Offer_BMK_SPD");
        let mut r = row(BATCH, "XS1", "99", "4", "100");
        r.push("187.6".into());
        let table = RawTable::from_rows(&headers, vec![r]);
        let q = &QuoteNormalizer::default().normalize(&table, now()).quotes[0];
        assert_eq!(q.bmk_spread, Some(188.0));
    }

    #[test]
    fn test_derive_sector() {
        assert_eq!(derive_sector("HY-Telecom").as_deref(), Some("HY"));
        assert_eq!(derive_sector("EM Corp").as_deref(), Some("EM"));
        assert_eq!(derive_sector("IG - CoCo").as_deref(), Some("IG FIN"));
        assert_eq!(derive_sector("IG Lower Tier 2").as_deref(), Some("IG FIN"));
        assert_eq!(derive_sector("IG - Industrials").as_deref(), Some("IG CORPO"));
        assert_eq!(derive_sector("-Orphan"), None);
    }
}
