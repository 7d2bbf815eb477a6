//! Rating category classification.
//!
//! Maps Fitch and Moody's letter ratings to a coarse [`RatingCategory`].
//! Fitch wins when usable; Moody's is the fallback. Matching is exact
//! membership after trimming and uppercasing.

use crate::types::{Quote, RatingCategory};

/// Ratings meaning "no usable rating".
const INVALID_RATINGS: [&str; 7] = ["", "N/A", "NR", "NOT RATED", "WD", "WR", "NAN"];

// Mixed-case Moody's entries can never match an uppercased rating; their
// uppercase forms are listed as well.
const INVESTMENT_GRADE: [&str; 17] = [
    "AAA", "AA+", "AA", "AA-", "A+", "A", "A-", "A1", "A2", "A3", "AA1", "AA2", "AA3", "Aaa",
    "Aa1", "Aa2", "Aa3",
];
const CROSSOVER: [&str; 9] = ["BBB+", "BBB", "BBB-", "BAA1", "BAA2", "BAA3", "BB+", "BB", "BB-"];
const HIGH_YIELD: [&str; 9] = ["B+", "B", "B-", "B1", "B2", "B3", "BA1", "BA2", "BA3"];
const JUNK: [&str; 9] = ["CCC+", "CCC", "CCC-", "CC", "C", "CA", "CAA1", "CAA2", "CAA3"];

/// Normalize a raw rating field; a missing field reads as "NAN".
fn normalize(raw: Option<&str>) -> String {
    raw.map(|r| r.trim().to_uppercase())
        .unwrap_or_else(|| "NAN".to_string())
}

fn is_valid(rating: &str) -> bool {
    !INVALID_RATINGS.contains(&rating)
}

/// Classify a pair of agency ratings.
pub fn classify_rating(fitch: Option<&str>, moodys: Option<&str>) -> RatingCategory {
    let fitch = normalize(fitch);
    let moodys = normalize(moodys);

    let rating = if is_valid(&fitch) {
        fitch
    } else if is_valid(&moodys) {
        moodys
    } else {
        return RatingCategory::NotRated;
    };

    let rating = rating.as_str();
    if INVESTMENT_GRADE.contains(&rating) {
        RatingCategory::InvestmentGrade
    } else if CROSSOVER.contains(&rating) {
        RatingCategory::Crossover
    } else if HIGH_YIELD.contains(&rating) {
        RatingCategory::HighYield
    } else if JUNK.contains(&rating) {
        RatingCategory::Junk
    } else {
        RatingCategory::NotRated
    }
}

/// Classify the ratings carried by a quote.
pub fn classify_quote(quote: &Quote) -> RatingCategory {
    classify_rating(quote.fitch_rating.as_deref(), quote.moodys_rating.as_deref())
}
