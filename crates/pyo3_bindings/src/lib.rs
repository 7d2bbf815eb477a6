//! PyO3 bindings for the axes dashboard core.
//!
//! Exposes the Rust pipeline to the Python UI:
//! - Quote cleaning and best-quote selection
//! - Rating and maturity classification
//! - Portfolio reconciliation
//! - Template export
//! - A `Dashboard` object holding one user session

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use axes_analytics::pipeline::now as local_now;
use axes_analytics::{AxeFilter, CrossMode, FlowDimension, FlowMeasure, Page, Session};
use axes_core::{
    AxesSnapshot, BestQuote as RustBestQuote, Config, Error,
    FundPosition as RustFundPosition, NetPosition as RustNetPosition, Quote as RustQuote,
    Trade as RustTrade, TradeDetail as RustTradeDetail,
};
use axes_core::config::ExportConfig;
use axes_portfolio::PortfolioFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Error and value conversion
// ============================================================================

fn py_err(e: Error) -> PyErr {
    match e {
        Error::Config(_) | Error::MissingColumn(_) | Error::Data(_) => {
            PyValueError::new_err(e.to_string())
        }
        _ => PyRuntimeError::new_err(e.to_string()),
    }
}

fn py_anyhow(e: anyhow::Error) -> PyErr {
    PyRuntimeError::new_err(format!("{e:#}"))
}

fn py_json(e: serde_json::Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn resolve_config(config_json: Option<&str>) -> anyhow::Result<Config> {
    match config_json {
        Some(json) => Config::from_json_str(json).context("invalid dashboard config"),
        None => Ok(Config::default()),
    }
}

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_date(raw: &str) -> PyResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| PyValueError::new_err(format!("invalid date {raw:?}: {e}")))
}

fn parse_now(raw: Option<&str>) -> PyResult<NaiveDateTime> {
    match raw {
        None => Ok(local_now()),
        Some(s) => NaiveDateTime::parse_from_str(s.trim(), TIMESTAMP_FORMAT)
            .or_else(|_| parse_date(s).map(|d| d.and_time(NaiveTime::MIN))),
    }
}

fn load_trades(path: &str, sheet: Option<&str>) -> PyResult<Vec<RustTrade>> {
    let default_sheet = Config::default().source.trades_sheet;
    let sheet = sheet.unwrap_or(&default_sheet);
    let table = axes_ingestion::read_sheet(path, sheet).map_err(py_err)?;
    axes_portfolio::parse_trades(&table).map_err(py_err)
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A cleaned dealer quote.
#[pyclass(name = "Quote")]
#[derive(Clone)]
pub struct PyQuote {
    inner: RustQuote,
}

#[pymethods]
impl PyQuote {
    #[getter]
    fn isin(&self) -> Option<String> {
        self.inner.isin.clone()
    }

    #[getter]
    fn dealer(&self) -> Option<String> {
        self.inner.dealer.clone()
    }

    #[getter]
    fn issuer_name(&self) -> Option<String> {
        self.inner.issuer_name.clone()
    }

    #[getter]
    fn bond_id(&self) -> Option<String> {
        self.inner.bond_id.clone()
    }

    #[getter]
    fn sector(&self) -> Option<String> {
        self.inner.sector.clone()
    }

    #[getter]
    fn sub_sector(&self) -> Option<String> {
        self.inner.sub_sector.clone()
    }

    #[getter]
    fn ticker(&self) -> Option<String> {
        self.inner.ticker.clone()
    }

    #[getter]
    fn currency(&self) -> Option<String> {
        self.inner.currency.clone()
    }

    /// ISO maturity date.
    #[getter]
    fn maturity(&self) -> String {
        self.inner.maturity.to_string()
    }

    #[getter]
    fn offer_price(&self) -> f64 {
        self.inner.offer_price
    }

    #[getter]
    fn offer_yield(&self) -> f64 {
        self.inner.offer_yield
    }

    #[getter]
    fn offer_qty(&self) -> f64 {
        self.inner.offer_qty
    }

    #[getter]
    fn bmk_spread(&self) -> Option<f64> {
        self.inner.bmk_spread
    }

    #[getter]
    fn composite_bid_price(&self) -> Option<f64> {
        self.inner.composite_bid_price
    }

    #[getter]
    fn composite_offer_price(&self) -> Option<f64> {
        self.inner.composite_offer_price
    }

    #[getter]
    fn axe_mid_spread(&self) -> Option<f64> {
        self.inner.axe_mid_spread
    }

    #[getter]
    fn rating_category(&self) -> &'static str {
        self.inner.rating_category.label()
    }

    /// Position of the offer against the composite range.
    #[getter]
    fn composite_zone(&self) -> Option<&'static str> {
        self.inner.composite_zone().map(|z| z.label())
    }

    #[getter]
    fn import_datetime(&self) -> String {
        format_ts(self.inner.import_datetime)
    }

    /// Every field, keyed by dashboard column name.
    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(py_json)
    }

    fn __repr__(&self) -> String {
        format!(
            "Quote(isin={:?}, dealer={:?}, price={:.2}, yield={:.3}, qty={})",
            self.inner.isin.as_deref().unwrap_or(""),
            self.inner.dealer.as_deref().unwrap_or(""),
            self.inner.offer_price,
            self.inner.offer_yield,
            self.inner.offer_qty
        )
    }
}

impl From<RustQuote> for PyQuote {
    fn from(q: RustQuote) -> Self {
        PyQuote { inner: q }
    }
}

impl From<PyQuote> for RustQuote {
    fn from(q: PyQuote) -> Self {
        q.inner
    }
}

/// The best actionable quote of one ISIN.
#[pyclass(name = "BestQuote")]
#[derive(Clone)]
pub struct PyBestQuote {
    inner: RustBestQuote,
}

#[pymethods]
impl PyBestQuote {
    #[getter]
    fn quote(&self) -> PyQuote {
        self.inner.quote.clone().into()
    }

    #[getter]
    fn isin(&self) -> Option<String> {
        self.inner.isin().map(String::from)
    }

    #[getter]
    fn best_dealer(&self) -> Option<String> {
        self.inner.best_dealer().map(String::from)
    }

    #[getter]
    fn nb_dealers_axe(&self) -> u32 {
        self.inner.nb_dealers_axe
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(py_json)
    }

    fn __repr__(&self) -> String {
        format!(
            "BestQuote(isin={:?}, best_dealer={:?}, yield={:.3}, nb_dealers={})",
            self.inner.isin().unwrap_or(""),
            self.inner.best_dealer().unwrap_or(""),
            self.inner.quote.offer_yield,
            self.inner.nb_dealers_axe
        )
    }
}

impl From<RustBestQuote> for PyBestQuote {
    fn from(b: RustBestQuote) -> Self {
        PyBestQuote { inner: b }
    }
}

impl From<PyBestQuote> for RustBestQuote {
    fn from(b: PyBestQuote) -> Self {
        b.inner
    }
}

/// Cleaned quotes and their best-quote reduction.
#[pyclass]
#[derive(Clone)]
pub struct Snapshot {
    #[pyo3(get)]
    pub full_axes: Vec<PyQuote>,
    #[pyo3(get)]
    pub best: Vec<PyBestQuote>,
    #[pyo3(get)]
    pub last_import: String,
}

#[pymethods]
impl Snapshot {
    fn is_empty(&self) -> bool {
        self.full_axes.is_empty()
    }

    fn __repr__(&self) -> String {
        format!(
            "Snapshot(quotes={}, best={}, last_import={})",
            self.full_axes.len(),
            self.best.len(),
            self.last_import
        )
    }
}

impl From<AxesSnapshot> for Snapshot {
    fn from(s: AxesSnapshot) -> Self {
        Snapshot {
            full_axes: s.full_axes.into_iter().map(Into::into).collect(),
            best: s.best.into_iter().map(Into::into).collect(),
            last_import: format_ts(s.last_import),
        }
    }
}

/// Net holding of one fund in one ISIN.
#[pyclass]
#[derive(Clone)]
pub struct NetPosition {
    #[pyo3(get)]
    pub isin: String,
    #[pyo3(get)]
    pub fund: String,
    #[pyo3(get)]
    pub net_qty: f64,
    #[pyo3(get)]
    pub operation_count: u32,
    #[pyo3(get)]
    pub last_operation_date: String,
    #[pyo3(get)]
    pub last_sens: String,
    #[pyo3(get)]
    pub last_manager: Option<String>,
    #[pyo3(get)]
    pub asset_manager: Option<String>,
}

#[pymethods]
impl NetPosition {
    fn __repr__(&self) -> String {
        format!(
            "NetPosition(isin={}, fund={}, net_qty={}, ops={})",
            self.isin, self.fund, self.net_qty, self.operation_count
        )
    }
}

impl From<RustNetPosition> for NetPosition {
    fn from(p: RustNetPosition) -> Self {
        NetPosition {
            isin: p.isin,
            fund: p.fund,
            net_qty: p.net_qty,
            operation_count: p.operation_count,
            last_operation_date: format_ts(p.last_operation_date),
            last_sens: p.last_sens.to_string(),
            last_manager: p.last_manager,
            asset_manager: p.asset_manager,
        }
    }
}

/// Per-fund summary for one ISIN.
#[pyclass]
#[derive(Clone)]
pub struct FundPosition {
    #[pyo3(get)]
    pub fund: String,
    #[pyo3(get)]
    pub net_qty: f64,
    #[pyo3(get)]
    pub operation_count: u32,
    #[pyo3(get)]
    pub last_sens: String,
    #[pyo3(get)]
    pub last_operation_date: String,
    #[pyo3(get)]
    pub last_manager: Option<String>,
}

impl From<RustFundPosition> for FundPosition {
    fn from(p: RustFundPosition) -> Self {
        FundPosition {
            fund: p.fund,
            net_qty: p.net_qty,
            operation_count: p.operation_count,
            last_sens: p.last_sens.to_string(),
            last_operation_date: format_ts(p.last_operation_date),
            last_manager: p.last_manager,
        }
    }
}

/// One raw operation of a fund.
#[pyclass]
#[derive(Clone)]
pub struct TradeDetail {
    #[pyo3(get)]
    pub fund: String,
    #[pyo3(get)]
    pub qty: f64,
    #[pyo3(get)]
    pub date: String,
    #[pyo3(get)]
    pub sens: String,
    #[pyo3(get)]
    pub manager: Option<String>,
    #[pyo3(get)]
    pub exec_price: Option<f64>,
}

impl From<RustTradeDetail> for TradeDetail {
    fn from(d: RustTradeDetail) -> Self {
        TradeDetail {
            fund: d.fund,
            qty: d.qty,
            date: format_ts(d.date),
            sens: d.sens.to_string(),
            manager: d.manager,
            exec_price: d.exec_price,
        }
    }
}

// ============================================================================
// Module functions
// ============================================================================

/// Load and clean the runs sheet of a workbook. Never raises on a bad source.
#[pyfunction]
#[pyo3(signature = (path, config_json=None))]
fn load_and_clean(path: &str, config_json: Option<&str>) -> PyResult<Snapshot> {
    let config = resolve_config(config_json).map_err(py_anyhow)?;
    Ok(axes_analytics::load_and_clean_path(path, &config).into())
}

/// Best quote per ISIN.
#[pyfunction]
fn select_best(quotes: Vec<PyQuote>) -> Vec<PyBestQuote> {
    let quotes: Vec<RustQuote> = quotes.into_iter().map(Into::into).collect();
    axes_analytics::select_best(&quotes)
        .into_iter()
        .map(Into::into)
        .collect()
}

/// Rating category label from Fitch and Moody's ratings.
#[pyfunction]
#[pyo3(signature = (fitch=None, moodys=None))]
fn classify_rating(fitch: Option<&str>, moodys: Option<&str>) -> &'static str {
    axes_core::classify_rating(fitch, moodys).label()
}

/// Maturity bucket label of an ISO date, relative to `now` (local time by default).
#[pyfunction]
#[pyo3(signature = (maturity=None, now=None))]
fn maturity_bucket(maturity: Option<&str>, now: Option<&str>) -> PyResult<&'static str> {
    let now = parse_now(now)?;
    let maturity = maturity.map(parse_date).transpose()?;
    Ok(axes_core::bucket_for(maturity, now).label())
}

/// Net positions per (ISIN, fund) from the trades sheet of a workbook.
#[pyfunction]
#[pyo3(signature = (path, sheet=None))]
fn reconcile_portfolio(path: &str, sheet: Option<&str>) -> PyResult<Vec<NetPosition>> {
    let trades = load_trades(path, sheet)?;
    Ok(axes_portfolio::reconcile_portfolio(&trades)
        .into_iter()
        .map(Into::into)
        .collect())
}

/// Per-fund summary and operation detail of one ISIN.
#[pyfunction]
#[pyo3(signature = (path, isin, sheet=None))]
fn positions_for_isin(
    path: &str,
    isin: &str,
    sheet: Option<&str>,
) -> PyResult<(Vec<FundPosition>, HashMap<String, Vec<TradeDetail>>)> {
    let trades = load_trades(path, sheet)?;
    let (summary, detail) = axes_portfolio::positions_for_isin(&trades, isin);
    let summary = summary.into_iter().map(Into::into).collect();
    let detail = detail
        .into_iter()
        .map(|(fund, ops)| (fund, ops.into_iter().map(Into::into).collect()))
        .collect();
    Ok((summary, detail))
}

/// Write best quotes into a workbook, optionally on top of a template.
///
/// Returns the columns written.
#[pyfunction]
#[pyo3(signature = (best, path, sheet_name="Axes", template=None))]
fn export_axes(
    best: Vec<PyBestQuote>,
    path: &str,
    sheet_name: &str,
    template: Option<&str>,
) -> PyResult<Vec<String>> {
    let rows: Vec<RustBestQuote> = best.into_iter().map(Into::into).collect();
    let config = ExportConfig {
        template: template.map(PathBuf::from),
        ..ExportConfig::default()
    };
    axes_ingestion::export_rows(&rows, &config, path, sheet_name).map_err(py_err)
}

/// Install a fmt subscriber. `RUST_LOG` takes precedence over `filter`.
///
/// Returns false when a subscriber is already installed.
#[pyfunction]
#[pyo3(signature = (filter=None))]
fn init_logging(filter: Option<&str>) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter.unwrap_or("info")));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .is_ok()
}

// ============================================================================
// Session
// ============================================================================

/// One user's dashboard session.
#[pyclass]
pub struct Dashboard {
    session: Session,
    config: Config,
}

#[pymethods]
impl Dashboard {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = resolve_config(config_json).map_err(py_anyhow)?;
        info!(workbook = %config.source.workbook.display(), "dashboard session opened");
        Ok(Dashboard {
            session: Session::new(),
            config,
        })
    }

    /// Load the configured workbook, from cache when unchanged.
    fn load(&mut self) -> Snapshot {
        self.session.load(&self.config).clone().into()
    }

    #[getter]
    fn best(&self) -> Vec<PyBestQuote> {
        self.session.best().iter().cloned().map(Into::into).collect()
    }

    #[getter]
    fn last_error(&self) -> Option<String> {
        self.session.last_error().map(String::from)
    }

    #[getter]
    fn page(&self) -> &'static str {
        self.session.page().key()
    }

    fn navigate(&mut self, key: &str) -> PyResult<()> {
        let page = Page::from_key(key)
            .ok_or_else(|| PyValueError::new_err(format!("unknown page {key:?}")))?;
        self.session.navigate(page);
        Ok(())
    }

    /// Import a headerless ISIN/ticker workbook. Returns (isins, tickers) counts.
    fn import_watchlist(&mut self, path: &str) -> PyResult<(usize, usize)> {
        let watchlist = self.session.import_watchlist(path).map_err(py_err)?;
        Ok((watchlist.isins.len(), watchlist.tickers.len()))
    }

    fn clear_watchlist(&mut self) {
        self.session.clear_watchlist();
    }

    /// Best quotes matching the watchlist by "isin" or "ticker".
    #[pyo3(signature = (mode="isin"))]
    fn cross_reference(&self, mode: &str) -> PyResult<Vec<PyBestQuote>> {
        let mode = match mode.to_lowercase().as_str() {
            "isin" => CrossMode::Isin,
            "ticker" => CrossMode::Ticker,
            other => return Err(PyValueError::new_err(format!("unknown mode {other:?}"))),
        };
        Ok(self
            .session
            .cross_reference(mode)
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Flow bars over the loaded quotes: (label, value) pairs.
    #[pyo3(signature = (dimension, by_quantity=false))]
    fn flow_bars(&self, dimension: &str, by_quantity: bool) -> PyResult<Vec<(String, f64)>> {
        let dimension = FlowDimension::from_label(dimension)
            .ok_or_else(|| PyValueError::new_err(format!("unknown dimension {dimension:?}")))?;
        let measure = if by_quantity {
            FlowMeasure::Quantity
        } else {
            FlowMeasure::Count
        };
        let quotes = self.session.snapshot().map_or(&[][..], |s| &s.full_axes[..]);
        Ok(axes_analytics::flow_bars(quotes, dimension, measure, local_now())
            .into_iter()
            .map(|bar| (bar.label, bar.value))
            .collect())
    }

    /// Dealers quoting one ISIN, as JSON records.
    fn dealer_table(&self, isin: &str) -> PyResult<String> {
        let quotes = self.session.snapshot().map_or(&[][..], |s| &s.full_axes[..]);
        serde_json::to_string(&axes_analytics::dealer_table(quotes, isin)).map_err(py_json)
    }

    /// Best axes on held bonds, as JSON records.
    ///
    /// Filters are JSON objects; missing fields keep everything.
    #[pyo3(signature = (filter_json=None, axe_filter_json=None))]
    fn portfolio_axes(
        &mut self,
        filter_json: Option<&str>,
        axe_filter_json: Option<&str>,
    ) -> PyResult<String> {
        let filter: PortfolioFilter = match filter_json {
            Some(json) => serde_json::from_str(json).map_err(py_json)?,
            None => PortfolioFilter::default(),
        };
        let axe_filter: Option<AxeFilter> = axe_filter_json
            .map(serde_json::from_str)
            .transpose()
            .map_err(py_json)?;

        let table = self.session.trades_table(&self.config).map_err(py_err)?;
        let trades = axes_portfolio::parse_trades(&table).map_err(py_err)?;
        let quotes = self.session.snapshot().map_or(&[][..], |s| &s.full_axes[..]);
        let rows = axes_portfolio::portfolio_axes(&trades, quotes, &filter, axe_filter.as_ref());
        serde_json::to_string(&rows).map_err(py_json)
    }

    /// Loader cache (hits, misses, entries).
    fn cache_stats(&self) -> (u64, u64, usize) {
        let stats = self.session.loader_stats();
        (stats.hits, stats.misses, stats.entries)
    }

    fn clear_cache(&mut self) {
        self.session.clear_cache();
    }

    fn to_json(&self) -> PyResult<String> {
        self.session.to_json().map_err(py_err)
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// Axes Dashboard Core - Rust pipeline for the dealer axes dashboard.
#[pymodule]
fn axes_dashboard_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<PyQuote>()?;
    m.add_class::<PyBestQuote>()?;
    m.add_class::<Snapshot>()?;
    m.add_class::<NetPosition>()?;
    m.add_class::<FundPosition>()?;
    m.add_class::<TradeDetail>()?;
    m.add_class::<Dashboard>()?;

    // Functions
    m.add_function(wrap_pyfunction!(load_and_clean, m)?)?;
    m.add_function(wrap_pyfunction!(select_best, m)?)?;
    m.add_function(wrap_pyfunction!(classify_rating, m)?)?;
    m.add_function(wrap_pyfunction!(maturity_bucket, m)?)?;
    m.add_function(wrap_pyfunction!(reconcile_portfolio, m)?)?;
    m.add_function(wrap_pyfunction!(positions_for_isin, m)?)?;
    m.add_function(wrap_pyfunction!(export_axes, m)?)?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;

    Ok(())
}
