//! Maturity bucketing relative to the current time.

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{MaturityBucket, Quote};

const SECONDS_PER_DAY: i64 = 86_400;

/// Years from `now` to `maturity`, counted in whole elapsed days over 365.
///
/// Negative for instruments that have already matured.
pub fn years_to_maturity(maturity: NaiveDate, now: NaiveDateTime) -> f64 {
    let elapsed = maturity.and_time(chrono::NaiveTime::MIN) - now;
    let days = elapsed.num_seconds().div_euclid(SECONDS_PER_DAY);
    days as f64 / 365.0
}

/// Bucket a maturity; a missing maturity is perpetual.
pub fn bucket_for(maturity: Option<NaiveDate>, now: NaiveDateTime) -> MaturityBucket {
    let Some(maturity) = maturity else {
        return MaturityBucket::Perp;
    };
    let delta = years_to_maturity(maturity, now);
    MaturityBucket::ALL
        .into_iter()
        .find(|bucket| bucket.upper_bound_years().is_some_and(|limit| delta <= limit))
        .unwrap_or(MaturityBucket::Perp)
}

/// A quote paired with its tenor bucket.
#[derive(Debug, Clone, Copy)]
pub struct BucketedQuote<'a> {
    pub quote: &'a Quote,
    pub bucket: MaturityBucket,
}

/// Attach a maturity bucket to every quote, leaving the quotes untouched.
pub fn bucketize(quotes: &[Quote], now: NaiveDateTime) -> Vec<BucketedQuote<'_>> {
    quotes
        .iter()
        .map(|quote| BucketedQuote {
            quote,
            bucket: bucket_for(Some(quote.maturity), now),
        })
        .collect()
}
