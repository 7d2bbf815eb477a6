//! Reconstitution of net positions from raw portfolio operations.
//!
//! Buys add to a position, anything else reduces it. Positions are keyed by
//! (ISIN, fund) and reported in key order.

use std::collections::BTreeMap;

use axes_core::{Error, FundPosition, NetPosition, Result, Sens, Trade, TradeDetail};
use axes_ingestion::coerce::{to_datetime, to_number, to_text};
use axes_ingestion::columns::{
    ASSET_MANAGER, EXEC_PRICE, FUND, ISIN, MANAGER, SENS, TRADE_DATE, TRADE_QTY,
};
use axes_ingestion::{RawRow, RawTable};
use tracing::{debug, info};

fn trimmed(row: &RawRow<'_>, column: &str) -> Option<String> {
    to_text(row.get(column)).map(|s| s.trim().to_string())
}

fn parse_trade(row: &RawRow<'_>) -> Option<Trade> {
    let isin = trimmed(row, ISIN)?;
    let qty = to_number(row.get(TRADE_QTY))?;
    let sens = to_text(row.get(SENS))?;
    let date = to_datetime(row.get(TRADE_DATE))?;
    let fund = trimmed(row, FUND)?;
    Some(Trade {
        isin,
        fund,
        manager: trimmed(row, MANAGER),
        asset_manager: trimmed(row, ASSET_MANAGER),
        qty,
        sens: Sens::parse(&sens),
        date,
        exec_price: to_number(row.get(EXEC_PRICE)),
    })
}

/// Parse the raw trades sheet.
///
/// Headers are trimmed and `Isin` is accepted for `ISIN`. Rows missing the
/// ISIN, quantity, sens, date or fund, or whose quantity or date cannot be
/// read, are dropped.
pub fn parse_trades(raw: &RawTable) -> Result<Vec<Trade>> {
    let table = raw.with_canonical_headers();
    if !table.has_column(ISIN) {
        return Err(Error::missing_column(ISIN));
    }
    let trades: Vec<Trade> = table.rows().filter_map(|row| parse_trade(&row)).collect();
    debug!(rows = table.len(), kept = trades.len(), "parsed portfolio trades");
    Ok(trades)
}

/// Running totals of one group of trades.
struct Accumulator<'a> {
    net_qty: f64,
    count: u32,
    latest: &'a Trade,
}

impl<'a> Accumulator<'a> {
    fn new(trade: &'a Trade) -> Self {
        Self {
            net_qty: trade.signed_qty(),
            count: 1,
            latest: trade,
        }
    }

    /// Later input wins on equal dates.
    fn push(&mut self, trade: &'a Trade) {
        self.net_qty += trade.signed_qty();
        self.count += 1;
        if trade.date >= self.latest.date {
            self.latest = trade;
        }
    }
}

fn accumulate<'a, K: Ord>(
    trades: impl Iterator<Item = &'a Trade>,
    key: impl Fn(&'a Trade) -> K,
) -> BTreeMap<K, Accumulator<'a>> {
    let mut groups: BTreeMap<K, Accumulator<'a>> = BTreeMap::new();
    for trade in trades {
        match groups.get_mut(&key(trade)) {
            Some(acc) => acc.push(trade),
            None => {
                groups.insert(key(trade), Accumulator::new(trade));
            }
        }
    }
    groups
}

/// Net positions per (ISIN, fund); positions netting to exactly zero are dropped.
pub fn reconcile_portfolio(trades: &[Trade]) -> Vec<NetPosition> {
    let groups = accumulate(trades.iter(), |t| (t.isin.as_str(), t.fund.as_str()));
    let total = groups.len();

    let positions: Vec<NetPosition> = groups
        .into_iter()
        .filter(|(_, acc)| acc.net_qty != 0.0)
        .map(|((isin, fund), acc)| NetPosition {
            isin: isin.to_string(),
            fund: fund.to_string(),
            net_qty: acc.net_qty,
            operation_count: acc.count,
            last_operation_date: acc.latest.date,
            last_sens: acc.latest.sens.clone(),
            last_manager: acc.latest.manager.clone(),
            asset_manager: acc.latest.asset_manager.clone(),
        })
        .collect();

    info!(
        trades = trades.len(),
        groups = total,
        positions = positions.len(),
        "portfolio reconciled"
    );
    positions
}

/// Per-fund summary and operation detail for one ISIN.
///
/// Empty when the ISIN has no trades. Flat positions are kept so the detail
/// stays auditable.
pub fn positions_for_isin(
    trades: &[Trade],
    isin: &str,
) -> (Vec<FundPosition>, BTreeMap<String, Vec<TradeDetail>>) {
    let scoped: Vec<&Trade> = trades.iter().filter(|t| t.isin == isin).collect();
    if scoped.is_empty() {
        return (Vec::new(), BTreeMap::new());
    }

    let summary: Vec<FundPosition> = accumulate(scoped.iter().copied(), |t| t.fund.as_str())
        .into_iter()
        .map(|(fund, acc)| FundPosition {
            fund: fund.to_string(),
            net_qty: acc.net_qty,
            operation_count: acc.count,
            last_sens: acc.latest.sens.clone(),
            last_operation_date: acc.latest.date,
            last_manager: acc.latest.manager.clone(),
        })
        .collect();

    let mut detail: BTreeMap<String, Vec<TradeDetail>> = BTreeMap::new();
    for trade in scoped {
        detail
            .entry(trade.fund.clone())
            .or_default()
            .push(TradeDetail::from(trade));
    }
    (summary, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use axes_ingestion::RawValue;

    fn trades_table(rows: Vec<Vec<RawValue>>) -> RawTable {
        RawTable::from_rows(
            &[" Isin ", "Fonds", "Gérant", "Asset Manager", "Qty", "Sens", "Date", "EXEC_PRICE"],
            rows,
        )
    }

    fn row(isin: &str, fund: &str, qty: f64, sens: &str, date: &str) -> Vec<RawValue> {
        vec![
            isin.into(),
            fund.into(),
            "Alice".into(),
            "AM1".into(),
            qty.into(),
            sens.into(),
            date.into(),
            99.5.into(),
        ]
    }

    #[test]
    fn test_net_position() {
        let raw = trades_table(vec![
            row("Z", "F1", 100.0, "buy", "2024-01-02"),
            row("Z", "F1", 30.0, " SELL ", "2024-01-05"),
            row("Z", "F1", 20.0, "Buy", "2024-01-03"),
        ]);
        let trades = parse_trades(&raw).unwrap();
        let positions = reconcile_portfolio(&trades);
        assert_eq!(positions.len(), 1);
        let p = &positions[0];
        assert_relative_eq!(p.net_qty, 90.0);
        assert_eq!(p.operation_count, 3);
        assert_eq!(p.last_sens, Sens::Sell);
        assert_eq!(p.last_operation_date.format("%Y-%m-%d").to_string(), "2024-01-05");
        assert_eq!(p.asset_manager.as_deref(), Some("AM1"));
    }

    #[test]
    fn test_zero_net_dropped() {
        let raw = trades_table(vec![
            row("Z", "F1", 50.0, "buy", "2024-01-02"),
            row("Z", "F1", 50.0, "sell", "2024-01-03"),
            row("Z", "F2", 10.0, "buy", "2024-01-03"),
        ]);
        let positions = reconcile_portfolio(&parse_trades(&raw).unwrap());
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].fund, "F2");
    }

    #[test]
    fn test_unknown_sens_reduces() {
        let raw = trades_table(vec![
            row("Z", "F1", 100.0, "buy", "2024-01-02"),
            row("Z", "F1", 40.0, "transfer", "2024-01-03"),
        ]);
        let positions = reconcile_portfolio(&parse_trades(&raw).unwrap());
        assert_relative_eq!(positions[0].net_qty, 60.0);
        assert_eq!(positions[0].last_sens.as_str(), "transfer");
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let mut missing_fund = row("Z", "", 10.0, "buy", "2024-01-02");
        missing_fund[1] = RawValue::Empty;
        let raw = trades_table(vec![
            row("Z", " F1 ", 10.0, "buy", "2024-01-02"),
            missing_fund,
            row("Z", "F1", 10.0, "buy", "not a date"),
            vec!["Z".into(), "F1".into(), RawValue::Empty, RawValue::Empty, "abc".into(), "buy".into(), "2024-01-02".into()],
        ]);
        let trades = parse_trades(&raw).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].fund, "F1");
        assert_eq!(trades[0].exec_price, Some(99.5));
    }

    #[test]
    fn test_quantity_is_plain_numeric() {
        let mut comma = row("Z", "F1", 0.0, "buy", "2024-01-02");
        comma[4] = "1,5".into();
        let mut spaced = row("Z", "F1", 0.0, "buy", "2024-01-02");
        spaced[4] = "1 500".into();
        let mut text = row("Z", "F1", 0.0, "buy", "2024-01-02");
        text[4] = " 250.5 ".into();
        let trades = parse_trades(&trades_table(vec![comma, spaced, text])).unwrap();
        assert_eq!(trades.len(), 1);
        assert_relative_eq!(trades[0].qty, 250.5);
    }

    #[test]
    fn test_missing_isin_column() {
        let raw = RawTable::from_rows(&["Fonds", "Qty"], vec![]);
        assert!(matches!(parse_trades(&raw), Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_positions_for_isin() {
        let raw = trades_table(vec![
            row("Z", "F2", 10.0, "buy", "2024-01-02"),
            row("Z", "F1", 100.0, "buy", "2024-01-02"),
            row("Y", "F1", 5.0, "buy", "2024-01-02"),
            row("Z", "F1", 100.0, "sell", "2024-01-04"),
        ]);
        let trades = parse_trades(&raw).unwrap();
        let (summary, detail) = positions_for_isin(&trades, "Z");

        let funds: Vec<_> = summary.iter().map(|p| p.fund.as_str()).collect();
        assert_eq!(funds, vec!["F1", "F2"]);
        assert_relative_eq!(summary[0].net_qty, 0.0);
        assert_eq!(summary[0].operation_count, 2);
        assert_eq!(detail["F1"].len(), 2);
        assert_eq!(detail["F2"][0].manager.as_deref(), Some("Alice"));

        let (summary, detail) = positions_for_isin(&trades, "NOPE");
        assert!(summary.is_empty());
        assert!(detail.is_empty());
    }
}
