//! Bond search and per-dealer detail.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use axes_core::Quote;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Searchable bonds: `"Bond ID – Issuer"` labels mapped to their ISIN.
///
/// Quotes missing any of the three fields are not searchable.
pub fn bond_options(full_axes: &[Quote]) -> BTreeMap<String, String> {
    full_axes
        .iter()
        .filter_map(|q| {
            let bond_id = q.bond_id.as_deref()?;
            let issuer = q.issuer_name.as_deref()?;
            let isin = q.isin.clone()?;
            Some((format!("{bond_id} – {issuer}"), isin))
        })
        .collect()
}

/// Restrict the search to a set of ISINs, as when searching within a filtered view.
pub fn restrict_to<'a>(full_axes: &'a [Quote], isins: &BTreeSet<String>) -> Vec<&'a Quote> {
    full_axes
        .iter()
        .filter(|q| q.isin.as_deref().is_some_and(|i| isins.contains(i)))
        .collect()
}

/// One dealer's offer on the searched bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealerRow {
    #[serde(rename = "Dealer")]
    pub dealer: Option<String>,
    #[serde(rename = "AXE_Offer_Price")]
    pub offer_price: f64,
    #[serde(rename = "AXE_Offer_YLD")]
    pub offer_yield: f64,
    #[serde(rename = "AXE_Offer_BMK_SPD")]
    pub bmk_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_QTY")]
    pub offer_qty: f64,
    #[serde(rename = "Composite_Bid_Price")]
    pub composite_bid_price: Option<f64>,
    #[serde(rename = "Composite_Offer_Price")]
    pub composite_offer_price: Option<f64>,
    #[serde(rename = "Axe_Mid_Spread")]
    pub axe_mid_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_Z-SPD")]
    pub z_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_I-SPD")]
    pub i_spread: Option<f64>,
    #[serde(rename = "AXE_Offer_ASW")]
    pub asw: Option<f64>,
}

impl From<&Quote> for DealerRow {
    fn from(q: &Quote) -> Self {
        Self {
            dealer: q.dealer.clone(),
            offer_price: q.offer_price,
            offer_yield: q.offer_yield,
            bmk_spread: q.bmk_spread,
            offer_qty: q.offer_qty,
            composite_bid_price: q.composite_bid_price,
            composite_offer_price: q.composite_offer_price,
            axe_mid_spread: q.axe_mid_spread,
            z_spread: q.z_spread,
            i_spread: q.i_spread,
            asw: q.asw,
        }
    }
}

/// Dealers quoting `isin`, cheapest against mid first, one row per dealer.
///
/// Quotes without an axe-vs-mid figure sort last.
pub fn dealer_table(full_axes: &[Quote], isin: &str) -> Vec<DealerRow> {
    let mut quotes: Vec<&Quote> = full_axes
        .iter()
        .filter(|q| q.isin.as_deref() == Some(isin))
        .collect();
    quotes.sort_by_key(|q| (q.axe_mid_spread.is_none(), q.axe_mid_spread.map(OrderedFloat)));

    let mut seen: HashSet<Option<&str>> = HashSet::new();
    quotes
        .into_iter()
        .filter(|q| seen.insert(q.dealer.as_deref()))
        .map(DealerRow::from)
        .collect()
}

/// Reference data of the searched bond, from its first quote.
pub fn bond_info<'a>(full_axes: &'a [Quote], isin: &str) -> Option<&'a Quote> {
    full_axes.iter().find(|q| q.isin.as_deref() == Some(isin))
}
