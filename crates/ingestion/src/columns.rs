//! Canonical column names and header aliases.

pub const IMPORT_DATETIME: &str = "ImportDateTime";
pub const ISIN: &str = "ISIN";
pub const DEALER: &str = "Dealer";
pub const BEST_DEALER: &str = "Best_Dealer";
pub const NB_DEALERS_AXE: &str = "Nb_Dealers_AXE";
pub const ISSUER_NAME: &str = "IssuerName";
pub const BOND_ID: &str = "Bond ID";
pub const SECTOR: &str = "Sector";
pub const SUB_SECTOR: &str = "Sub_Sector";
pub const TICKER: &str = "Ticker";
pub const CURRENCY: &str = "Currency";
pub const COUPON: &str = "Coupon";
pub const COUPON_TYPE: &str = "CouponType";
pub const MATURITY: &str = "Maturity";
pub const FITCH_RATING: &str = "FitchRating";
pub const MOODYS_RATING: &str = "Moody's_rating";
pub const RATING_CATEGORY: &str = "Rating_Category";

pub const OFFER_PRICE: &str = "AXE_Offer_Price";
pub const OFFER_YIELD: &str = "AXE_Offer_YLD";
pub const OFFER_QTY: &str = "AXE_Offer_QTY";
pub const BMK_SPREAD: &str = "AXE_Offer_BMK_SPD";
pub const I_SPREAD: &str = "AXE_Offer_I-SPD";
pub const Z_SPREAD: &str = "AXE_Offer_Z-SPD";
pub const ASW: &str = "AXE_Offer_ASW";

pub const STREAM_OFFER_PRICE: &str = "Stream_Offer_Price";
pub const STREAM_OFFER_YIELD: &str = "Stream_Offer_YLD";

pub const TW_OFFER_PRICE: &str = "TW_Offer_Price";
pub const TW_BID_PRICE: &str = "TW_Bid_Price";
pub const COMPOSITE_OFFER_PRICE: &str = "Composite_Offer_Price";
pub const COMPOSITE_BID_PRICE: &str = "Composite_Bid_Price";
pub const MID_PRICE: &str = "Mid_Price";
pub const AXE_MID_SPREAD: &str = "Axe_Mid_Spread";

pub const FUND: &str = "Fonds";
pub const TRADE_QTY: &str = "Qty";
pub const SENS: &str = "Sens";
pub const TRADE_DATE: &str = "Date";
pub const MANAGER: &str = "Gérant";
pub const ASSET_MANAGER: &str = "Asset Manager";
pub const EXEC_PRICE: &str = "EXEC_PRICE";

/// Legacy AXE column prefix.
pub const LEGACY_OFFER_PREFIX: &str = "IA_Offer_";
/// Canonical AXE column prefix.
pub const OFFER_PREFIX: &str = "AXE_Offer_";

/// Free-text header spellings and their canonical names.
pub const HEADER_ALIASES: [(&str, &str); 5] = [
    ("Issuer name", ISSUER_NAME),
    ("Isin", ISIN),
    ("Coupon type", COUPON_TYPE),
    ("Fitch rating", FITCH_RATING),
    ("Moody's rating", MOODYS_RATING),
];

/// Columns shown in the interactive tables.
pub const DISPLAY_COLUMNS: [&str; 25] = [
    ISSUER_NAME,
    BOND_ID,
    SECTOR,
    SUB_SECTOR,
    TICKER,
    ISIN,
    CURRENCY,
    COUPON,
    COUPON_TYPE,
    MATURITY,
    OFFER_PRICE,
    OFFER_YIELD,
    OFFER_QTY,
    NB_DEALERS_AXE,
    BEST_DEALER,
    COMPOSITE_BID_PRICE,
    COMPOSITE_OFFER_PRICE,
    AXE_MID_SPREAD,
    BMK_SPREAD,
    Z_SPREAD,
    I_SPREAD,
    ASW,
    FITCH_RATING,
    MOODYS_RATING,
    RATING_CATEGORY,
];

/// Every column a cleaned quote carries, in source order.
pub const QUOTE_COLUMNS: [&str; 28] = [
    IMPORT_DATETIME,
    ISIN,
    DEALER,
    ISSUER_NAME,
    BOND_ID,
    SECTOR,
    SUB_SECTOR,
    TICKER,
    CURRENCY,
    COUPON,
    COUPON_TYPE,
    MATURITY,
    FITCH_RATING,
    MOODYS_RATING,
    OFFER_PRICE,
    OFFER_YIELD,
    OFFER_QTY,
    BMK_SPREAD,
    I_SPREAD,
    Z_SPREAD,
    ASW,
    STREAM_OFFER_PRICE,
    STREAM_OFFER_YIELD,
    COMPOSITE_BID_PRICE,
    COMPOSITE_OFFER_PRICE,
    MID_PRICE,
    AXE_MID_SPREAD,
    RATING_CATEGORY,
];

/// Canonical name for a trimmed raw header.
pub fn canonical_header(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some((_, canonical)) = HEADER_ALIASES.iter().find(|(alias, _)| *alias == trimmed) {
        return canonical.to_string();
    }
    if let Some(rest) = trimmed.strip_prefix(LEGACY_OFFER_PREFIX) {
        return format!("{OFFER_PREFIX}{rest}");
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert_eq!(canonical_header(" Issuer name "), ISSUER_NAME);
        assert_eq!(canonical_header("Isin"), ISIN);
        assert_eq!(canonical_header("Moody's rating"), MOODYS_RATING);
        assert_eq!(canonical_header("IA_Offer_Z-SPD"), Z_SPREAD);
        assert_eq!(canonical_header("IA_Offer_QTY"), OFFER_QTY);
        assert_eq!(canonical_header("Ticker "), TICKER);
    }
}
