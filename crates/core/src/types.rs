//! Core data types for the axes dashboard.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse credit-risk bucket derived from agency ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatingCategory {
    #[serde(rename = "Investment Grade")]
    InvestmentGrade,
    #[serde(rename = "Crossover")]
    Crossover,
    #[serde(rename = "High Yield")]
    HighYield,
    #[serde(rename = "Junk")]
    Junk,
    #[serde(rename = "Not Rated")]
    NotRated,
}

impl RatingCategory {
    /// All categories, best credit first.
    pub const ALL: [RatingCategory; 5] = [
        RatingCategory::InvestmentGrade,
        RatingCategory::Crossover,
        RatingCategory::HighYield,
        RatingCategory::Junk,
        RatingCategory::NotRated,
    ];

    /// Dashboard label.
    pub fn label(self) -> &'static str {
        match self {
            RatingCategory::InvestmentGrade => "Investment Grade",
            RatingCategory::Crossover => "Crossover",
            RatingCategory::HighYield => "High Yield",
            RatingCategory::Junk => "Junk",
            RatingCategory::NotRated => "Not Rated",
        }
    }

    /// Parse a dashboard label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label.trim())
    }
}

impl fmt::Display for RatingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tenor bucket of a bond relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MaturityBucket {
    #[serde(rename = "0-1Y")]
    Y0To1,
    #[serde(rename = "1-2Y")]
    Y1To2,
    #[serde(rename = "2-3Y")]
    Y2To3,
    #[serde(rename = "3-4Y")]
    Y3To4,
    #[serde(rename = "4-5Y")]
    Y4To5,
    #[serde(rename = "5-7Y")]
    Y5To7,
    #[serde(rename = "7-8Y")]
    Y7To8,
    #[serde(rename = "8-10Y")]
    Y8To10,
    #[serde(rename = "10-15Y")]
    Y10To15,
    #[serde(rename = "15-20Y")]
    Y15To20,
    #[serde(rename = "20-25Y")]
    Y20To25,
    #[serde(rename = "25-30Y")]
    Y25To30,
    #[serde(rename = "PERP")]
    Perp,
}

impl MaturityBucket {
    /// All buckets in tenor order, PERP last.
    pub const ALL: [MaturityBucket; 13] = [
        MaturityBucket::Y0To1,
        MaturityBucket::Y1To2,
        MaturityBucket::Y2To3,
        MaturityBucket::Y3To4,
        MaturityBucket::Y4To5,
        MaturityBucket::Y5To7,
        MaturityBucket::Y7To8,
        MaturityBucket::Y8To10,
        MaturityBucket::Y10To15,
        MaturityBucket::Y15To20,
        MaturityBucket::Y20To25,
        MaturityBucket::Y25To30,
        MaturityBucket::Perp,
    ];

    /// Inclusive upper bound in years, `None` for PERP.
    pub fn upper_bound_years(self) -> Option<f64> {
        let years = match self {
            MaturityBucket::Y0To1 => 1.0,
            MaturityBucket::Y1To2 => 2.0,
            MaturityBucket::Y2To3 => 3.0,
            MaturityBucket::Y3To4 => 4.0,
            MaturityBucket::Y4To5 => 5.0,
            MaturityBucket::Y5To7 => 7.0,
            MaturityBucket::Y7To8 => 8.0,
            MaturityBucket::Y8To10 => 10.0,
            MaturityBucket::Y10To15 => 15.0,
            MaturityBucket::Y15To20 => 20.0,
            MaturityBucket::Y20To25 => 25.0,
            MaturityBucket::Y25To30 => 30.0,
            MaturityBucket::Perp => return None,
        };
        Some(years)
    }

    /// Dashboard label.
    pub fn label(self) -> &'static str {
        match self {
            MaturityBucket::Y0To1 => "0-1Y",
            MaturityBucket::Y1To2 => "1-2Y",
            MaturityBucket::Y2To3 => "2-3Y",
            MaturityBucket::Y3To4 => "3-4Y",
            MaturityBucket::Y4To5 => "4-5Y",
            MaturityBucket::Y5To7 => "5-7Y",
            MaturityBucket::Y7To8 => "7-8Y",
            MaturityBucket::Y8To10 => "8-10Y",
            MaturityBucket::Y10To15 => "10-15Y",
            MaturityBucket::Y15To20 => "15-20Y",
            MaturityBucket::Y20To25 => "20-25Y",
            MaturityBucket::Y25To30 => "25-30Y",
            MaturityBucket::Perp => "PERP",
        }
    }

    /// Position in the tenor ladder.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for MaturityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One dealer's offer on one instrument, from the latest import batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    #[serde(rename = "ISIN")]
    pub isin: Option<String>,
    #[serde(rename = "Dealer")]
    pub dealer: Option<String>,
    #[serde(rename = "IssuerName")]
    pub issuer_name: Option<String>,
    #[serde(rename = "Bond ID")]
    pub bond_id: Option<String>,
    /// Leading token of the sub-sector, or an IG override.
    #[serde(rename = "Sector")]
    pub sector: Option<String>,
    /// Raw sector string as delivered by the source.
    #[serde(rename = "Sub_Sector")]
    pub sub_sector: Option<String>,
    #[serde(rename = "Ticker")]
    pub ticker: Option<String>,
    #[serde(rename = "Currency")]
    pub currency: Option<String>,
    #[serde(rename = "Coupon")]
    pub coupon: Option<f64>,
    #[serde(rename = "CouponType")]
    pub coupon_type: Option<String>,
    /// Capped maturity; unknown maturities carry the sentinel date.
    #[serde(rename = "Maturity")]
    pub maturity: NaiveDate,
    #[serde(rename = "FitchRating")]
    pub fitch_rating: Option<String>,
    #[serde(rename = "Moody's_rating")]
    pub moodys_rating: Option<String>,
    #[serde(rename = "AXE_Offer_Price")]
    pub offer_price: f64,
    /// Always non-negative.
    #[serde(rename = "AXE_Offer_YLD")]
    pub offer_yield: f64,
    /// Nominal, already scaled from thousands.
    #[serde(rename = "AXE_Offer_QTY")]
    pub offer_qty: f64,
    #[serde(rename = "AXE_Offer_BMK_SPD")]
    pub bmk_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_I-SPD")]
    pub i_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_Z-SPD")]
    pub z_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_ASW")]
    pub asw: Option<f64>,
    #[serde(rename = "Stream_Offer_Price")]
    pub stream_offer_price: Option<f64>,
    #[serde(rename = "Stream_Offer_YLD")]
    pub stream_offer_yield: Option<f64>,
    #[serde(rename = "Composite_Bid_Price")]
    pub composite_bid_price: Option<f64>,
    #[serde(rename = "Composite_Offer_Price")]
    pub composite_offer_price: Option<f64>,
    #[serde(rename = "Mid_Price")]
    pub mid_price: Option<f64>,
    /// AXE offer price minus composite mid.
    #[serde(rename = "Axe_Mid_Spread")]
    pub axe_mid_spread: Option<f64>,
    #[serde(rename = "Rating_Category")]
    pub rating_category: RatingCategory,
    #[serde(rename = "ImportDateTime")]
    pub import_datetime: NaiveDateTime,
}

impl Quote {
    /// Create a quote with the mandatory figures; every optional field is empty.
    pub fn new(
        isin: impl Into<String>,
        dealer: impl Into<String>,
        offer_price: f64,
        offer_yield: f64,
        offer_qty: f64,
        maturity: NaiveDate,
        import_datetime: NaiveDateTime,
    ) -> Self {
        Self {
            isin: Some(isin.into()),
            dealer: Some(dealer.into()),
            issuer_name: None,
            bond_id: None,
            sector: None,
            sub_sector: None,
            ticker: None,
            currency: None,
            coupon: None,
            coupon_type: None,
            maturity,
            fitch_rating: None,
            moodys_rating: None,
            offer_price,
            offer_yield,
            offer_qty,
            bmk_spread: None,
            i_spread: None,
            z_spread: None,
            asw: None,
            stream_offer_price: None,
            stream_offer_yield: None,
            composite_bid_price: None,
            composite_offer_price: None,
            mid_price: None,
            axe_mid_spread: None,
            rating_category: RatingCategory::NotRated,
            import_datetime,
        }
    }

    /// Width of the composite bid/offer range.
    pub fn composite_gap(&self) -> Option<f64> {
        match (self.composite_bid_price, self.composite_offer_price) {
            (Some(bid), Some(offer)) => Some((offer - bid).abs()),
            _ => None,
        }
    }

    /// Where the AXE offer sits inside the composite range.
    pub fn composite_zone(&self) -> Option<CompositeZone> {
        CompositeZone::classify(
            self.offer_price,
            self.composite_bid_price?,
            self.composite_offer_price?,
        )
    }
}

/// The best actionable quote of one ISIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestQuote {
    /// Winning quote; its dealer is the best dealer.
    #[serde(flatten)]
    pub quote: Quote,
    /// Distinct dealers quoting the ISIN, actionable or not.
    #[serde(rename = "Nb_Dealers_AXE")]
    pub nb_dealers_axe: u32,
}

impl BestQuote {
    /// Dealer of the winning quote.
    pub fn best_dealer(&self) -> Option<&str> {
        self.quote.dealer.as_deref()
    }

    /// ISIN of the winning quote.
    pub fn isin(&self) -> Option<&str> {
        self.quote.isin.as_deref()
    }
}

/// Position of an AXE offer relative to the composite range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeZone {
    #[serde(rename = "> Offer")]
    AboveOffer,
    #[serde(rename = "Mid-Offer")]
    MidOffer,
    #[serde(rename = "Bid-Mid")]
    BidMid,
    #[serde(rename = "< Bid")]
    BelowBid,
}

impl CompositeZone {
    /// Classify a price against a composite bid/offer.
    pub fn classify(price: f64, bid: f64, offer: f64) -> Option<Self> {
        if price.is_nan() || bid.is_nan() || offer.is_nan() {
            return None;
        }
        let mid = (bid + offer) / 2.0;
        let zone = if price > offer {
            CompositeZone::AboveOffer
        } else if price > mid {
            CompositeZone::MidOffer
        } else if price >= bid {
            CompositeZone::BidMid
        } else {
            CompositeZone::BelowBid
        };
        Some(zone)
    }

    /// Dashboard label.
    pub fn label(self) -> &'static str {
        match self {
            CompositeZone::AboveOffer => "> Offer",
            CompositeZone::MidOffer => "Mid-Offer",
            CompositeZone::BidMid => "Bid-Mid",
            CompositeZone::BelowBid => "< Bid",
        }
    }
}

/// Direction of a portfolio operation.
///
/// Anything other than "buy" reduces the position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sens {
    Buy,
    Sell,
    /// Unrecognised word, kept as normalized.
    Other(String),
}

impl Sens {
    /// Parse a raw sens, lowercased and trimmed.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "buy" => Sens::Buy,
            "sell" => Sens::Sell,
            _ => Sens::Other(normalized),
        }
    }

    /// Sign applied to the traded quantity.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Sens::Buy => 1.0,
            _ => -1.0,
        }
    }

    /// Normalized word.
    pub fn as_str(&self) -> &str {
        match self {
            Sens::Buy => "buy",
            Sens::Sell => "sell",
            Sens::Other(s) => s,
        }
    }
}

impl fmt::Display for Sens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One portfolio operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(rename = "ISIN")]
    pub isin: String,
    #[serde(rename = "Fonds")]
    pub fund: String,
    #[serde(rename = "Gérant")]
    pub manager: Option<String>,
    #[serde(rename = "Asset Manager")]
    pub asset_manager: Option<String>,
    /// Unsigned traded quantity as booked.
    #[serde(rename = "Qty")]
    pub qty: f64,
    #[serde(rename = "Sens")]
    pub sens: Sens,
    #[serde(rename = "Date")]
    pub date: NaiveDateTime,
    #[serde(rename = "EXEC_PRICE")]
    pub exec_price: Option<f64>,
}

impl Trade {
    /// Quantity signed by the sens.
    #[inline]
    pub fn signed_qty(&self) -> f64 {
        self.qty * self.sens.sign()
    }
}

/// Net holding of one fund in one ISIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPosition {
    #[serde(rename = "ISIN")]
    pub isin: String,
    #[serde(rename = "Fonds")]
    pub fund: String,
    #[serde(rename = "Qty_Nette")]
    pub net_qty: f64,
    #[serde(rename = "Nb_Operations")]
    pub operation_count: u32,
    #[serde(rename = "Date_Derniere_Op")]
    pub last_operation_date: NaiveDateTime,
    #[serde(rename = "Dernier_Sens")]
    pub last_sens: Sens,
    #[serde(rename = "Dernier_Gerant")]
    pub last_manager: Option<String>,
    #[serde(rename = "Asset_Manager")]
    pub asset_manager: Option<String>,
}

/// Per-fund summary for a single ISIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPosition {
    #[serde(rename = "Fonds")]
    pub fund: String,
    #[serde(rename = "Qty_Nette")]
    pub net_qty: f64,
    #[serde(rename = "Nb_Operations")]
    pub operation_count: u32,
    #[serde(rename = "Dernier_Sens")]
    pub last_sens: Sens,
    #[serde(rename = "Date_Derniere_Op")]
    pub last_operation_date: NaiveDateTime,
    #[serde(rename = "Dernier_Gerant")]
    pub last_manager: Option<String>,
}

/// One raw operation shown in the audit detail of a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDetail {
    #[serde(rename = "Fonds")]
    pub fund: String,
    #[serde(rename = "Qty")]
    pub qty: f64,
    #[serde(rename = "Date")]
    pub date: NaiveDateTime,
    #[serde(rename = "Sens")]
    pub sens: Sens,
    #[serde(rename = "Gérant")]
    pub manager: Option<String>,
    #[serde(rename = "EXEC_PRICE")]
    pub exec_price: Option<f64>,
}

impl From<&Trade> for TradeDetail {
    fn from(t: &Trade) -> Self {
        TradeDetail {
            fund: t.fund.clone(),
            qty: t.qty,
            date: t.date,
            sens: t.sens.clone(),
            manager: t.manager.clone(),
            exec_price: t.exec_price,
        }
    }
}

/// Cleaned quotes of one import batch and their best-quote reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxesSnapshot {
    /// Every cleaned quote.
    pub full_axes: Vec<Quote>,
    /// One best quote per ISIN.
    pub best: Vec<BestQuote>,
    /// Timestamp of the retained batch, or the load time when empty.
    pub last_import: NaiveDateTime,
}

impl AxesSnapshot {
    /// An empty snapshot stamped with the given time.
    pub fn empty(now: NaiveDateTime) -> Self {
        Self {
            full_axes: Vec::new(),
            best: Vec::new(),
            last_import: now,
        }
    }

    /// Whether no quote survived cleaning.
    pub fn is_empty(&self) -> bool {
        self.full_axes.is_empty()
    }
}
