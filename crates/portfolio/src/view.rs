//! Portfolio holdings crossed with the available axes.

use std::collections::{BTreeMap, BTreeSet};

use axes_analytics::{select_best, AxeFilter, Range};
use axes_core::{BestQuote, NetPosition, Quote, Sens, Trade};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::reconcile::reconcile_portfolio;

/// Portfolio-side criteria.
///
/// Empty sets and unset bounds keep everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioFilter {
    pub asset_manager: Option<String>,
    /// Earliest operation date taken into account.
    pub min_date: Option<NaiveDate>,
    pub funds: BTreeSet<String>,
    pub managers: BTreeSet<String>,
    /// Normalized sens words of the last operation.
    pub last_sens: BTreeSet<String>,
    /// Bounds on the net quantity held per ISIN.
    pub exposure: Option<Range>,
}

impl PortfolioFilter {
    fn admits_trade(&self, trade: &Trade) -> bool {
        let am_ok = self
            .asset_manager
            .as_deref()
            .map_or(true, |am| trade.asset_manager.as_deref() == Some(am));
        let date_ok = self.min_date.map_or(true, |d| trade.date.date() >= d);
        let fund_ok = self.funds.is_empty() || self.funds.contains(&trade.fund);
        let manager_ok = self.managers.is_empty()
            || trade
                .manager
                .as_deref()
                .is_some_and(|m| self.managers.contains(m));
        am_ok && date_ok && fund_ok && manager_ok
    }

    fn admits_position(&self, position: &NetPosition) -> bool {
        self.last_sens.is_empty() || self.last_sens.contains(position.last_sens.as_str())
    }
}

/// Choices offered by the portfolio filter for one asset manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioOptions {
    pub asset_managers: Vec<String>,
    pub funds: Vec<String>,
    pub managers: Vec<String>,
    pub earliest: Option<NaiveDate>,
}

impl PortfolioOptions {
    /// Sorted distinct values; funds, managers and dates are scoped to `asset_manager`.
    pub fn from_trades(trades: &[Trade], asset_manager: Option<&str>) -> Self {
        let asset_managers: BTreeSet<&str> =
            trades.iter().filter_map(|t| t.asset_manager.as_deref()).collect();
        let scoped: Vec<&Trade> = trades
            .iter()
            .filter(|t| asset_manager.map_or(true, |am| t.asset_manager.as_deref() == Some(am)))
            .collect();
        let funds: BTreeSet<&str> = scoped.iter().map(|t| t.fund.as_str()).collect();
        let managers: BTreeSet<&str> = scoped.iter().filter_map(|t| t.manager.as_deref()).collect();
        Self {
            asset_managers: asset_managers.into_iter().map(String::from).collect(),
            funds: funds.into_iter().map(String::from).collect(),
            managers: managers.into_iter().map(String::from).collect(),
            earliest: scoped.iter().map(|t| t.date.date()).min(),
        }
    }
}

/// Long exposure of the portfolio to one ISIN, across funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsinExposure {
    #[serde(rename = "Qty_Nette")]
    pub net_qty: f64,
    /// Sens of the last fund position in key order.
    #[serde(rename = "Dernier_Sens")]
    pub last_sens: Sens,
    #[serde(rename = "Date_Derniere_Op")]
    pub last_operation_date: NaiveDateTime,
    #[serde(rename = "Nb_Operations")]
    pub operation_count: u32,
}

/// Sum fund positions per ISIN.
pub fn exposure_by_isin(positions: &[NetPosition]) -> BTreeMap<String, IsinExposure> {
    let mut exposures: BTreeMap<String, IsinExposure> = BTreeMap::new();
    for p in positions {
        exposures
            .entry(p.isin.clone())
            .and_modify(|e| {
                e.net_qty += p.net_qty;
                e.last_sens = p.last_sens.clone();
                e.last_operation_date = e.last_operation_date.max(p.last_operation_date);
                e.operation_count += p.operation_count;
            })
            .or_insert_with(|| IsinExposure {
                net_qty: p.net_qty,
                last_sens: p.last_sens.clone(),
                last_operation_date: p.last_operation_date,
                operation_count: p.operation_count,
            });
    }
    exposures
}

/// Best axe on a held bond, with the holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAxe {
    #[serde(flatten)]
    pub best: BestQuote,
    #[serde(flatten)]
    pub exposure: IsinExposure,
}

/// Best axes on the bonds currently held long.
///
/// Trades are filtered and reconciled, positions kept when their last sens
/// matches and they net long, then summed per ISIN. The best quote is
/// selected among that ISIN's axes, after `axe_filter` when given, and joined
/// with the holding. The exposure bound applies last.
pub fn portfolio_axes(
    trades: &[Trade],
    full_axes: &[Quote],
    filter: &PortfolioFilter,
    axe_filter: Option<&AxeFilter>,
) -> Vec<PortfolioAxe> {
    let scoped: Vec<Trade> = trades
        .iter()
        .filter(|t| filter.admits_trade(t))
        .cloned()
        .collect();
    let positions: Vec<NetPosition> = reconcile_portfolio(&scoped)
        .into_iter()
        .filter(|p| filter.admits_position(p) && p.net_qty > 0.0)
        .collect();
    let exposures = exposure_by_isin(&positions);

    let held: Vec<Quote> = full_axes
        .iter()
        .filter(|q| q.isin.as_deref().is_some_and(|i| exposures.contains_key(i)))
        .cloned()
        .collect();
    let held = match axe_filter {
        Some(f) => f.apply_to_quotes(&held),
        None => held,
    };

    let rows: Vec<PortfolioAxe> = select_best(&held)
        .into_iter()
        .filter_map(|best| {
            let exposure = exposures.get(best.isin()?)?.clone();
            if let Some(range) = filter.exposure {
                if !range.admits(Some(exposure.net_qty)) {
                    return None;
                }
            }
            Some(PortfolioAxe { best, exposure })
        })
        .collect();

    debug!(
        trades = scoped.len(),
        positions = positions.len(),
        held_isins = exposures.len(),
        rows = rows.len(),
        "portfolio axes"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn trade(isin: &str, fund: &str, qty: f64, sens: Sens, day: u32, am: &str) -> Trade {
        Trade {
            isin: isin.to_string(),
            fund: fund.to_string(),
            manager: Some("Alice".to_string()),
            asset_manager: Some(am.to_string()),
            qty,
            sens,
            date: date(day),
            exec_price: None,
        }
    }

    fn quote(isin: &str, dealer: &str, yld: f64, qty: f64) -> Quote {
        let maturity = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        Quote::new(isin, dealer, 99.0, yld, qty, maturity, date(1))
    }

    fn trades() -> Vec<Trade> {
        vec![
            trade("A", "F1", 100.0, Sens::Buy, 2, "AM1"),
            trade("A", "F2", 50.0, Sens::Buy, 3, "AM1"),
            trade("B", "F1", 80.0, Sens::Buy, 2, "AM1"),
            trade("B", "F1", 80.0, Sens::Sell, 4, "AM1"),
            trade("C", "F1", 30.0, Sens::Buy, 5, "AM2"),
            trade("D", "F1", 10.0, Sens::Sell, 5, "AM1"),
        ]
    }

    fn axes() -> Vec<Quote> {
        vec![
            quote("A", "GS", 4.0, 1_000_000.0),
            quote("A", "MS", 4.5, 500_000.0),
            quote("B", "GS", 5.0, 1_000_000.0),
            quote("C", "GS", 6.0, 1_000_000.0),
            quote("D", "GS", 6.0, 1_000_000.0),
        ]
    }

    #[test]
    fn test_portfolio_axes_join() {
        let filter = PortfolioFilter {
            asset_manager: Some("AM1".to_string()),
            ..Default::default()
        };
        let rows = portfolio_axes(&trades(), &axes(), &filter, None);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.best.isin(), Some("A"));
        assert_eq!(row.best.best_dealer(), Some("MS"));
        assert_eq!(row.best.nb_dealers_axe, 2);
        assert_relative_eq!(row.exposure.net_qty, 150.0);
        assert_eq!(row.exposure.operation_count, 2);
        assert_eq!(row.exposure.last_operation_date, date(3));
    }

    #[test]
    fn test_axe_filter_reselects_best() {
        let axe_filter = AxeFilter {
            dealers: BTreeSet::from(["GS".to_string()]),
            ..Default::default()
        };
        let rows = portfolio_axes(&trades(), &axes(), &PortfolioFilter::default(), Some(&axe_filter));
        let isins: Vec<_> = rows.iter().filter_map(|r| r.best.isin()).collect();
        assert_eq!(isins, vec!["A", "C"]);
        assert_eq!(rows[0].best.best_dealer(), Some("GS"));
        assert_eq!(rows[0].best.nb_dealers_axe, 1);
    }

    #[test]
    fn test_exposure_and_date_bounds() {
        let filter = PortfolioFilter {
            exposure: Some(Range::new(0.0, 100.0)),
            ..Default::default()
        };
        let rows = portfolio_axes(&trades(), &axes(), &filter, None);
        let isins: Vec<_> = rows.iter().filter_map(|r| r.best.isin()).collect();
        assert_eq!(isins, vec!["C"]);

        let filter = PortfolioFilter {
            min_date: Some(date(3).date()),
            ..Default::default()
        };
        let rows = portfolio_axes(&trades(), &axes(), &filter, None);
        let isins: Vec<_> = rows.iter().filter_map(|r| r.best.isin()).collect();
        assert_eq!(isins, vec!["A", "C"]);
        assert_relative_eq!(rows[0].exposure.net_qty, 50.0);
    }

    #[test]
    fn test_last_sens_filter() {
        let filter = PortfolioFilter {
            last_sens: BTreeSet::from(["sell".to_string()]),
            ..Default::default()
        };
        assert!(portfolio_axes(&trades(), &axes(), &filter, None).is_empty());
    }

    #[test]
    fn test_options() {
        let options = PortfolioOptions::from_trades(&trades(), Some("AM2"));
        assert_eq!(options.asset_managers, vec!["AM1", "AM2"]);
        assert_eq!(options.funds, vec!["F1"]);
        assert_eq!(options.earliest, Some(date(5).date()));
    }
}
