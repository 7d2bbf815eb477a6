//! Portfolio reconciliation for the axes dashboard.
//!
//! This crate provides:
//! - Trade parsing and net position reconstitution
//! - Per-fund audit detail for one ISIN
//! - The cross view of held bonds against their best axes

pub mod reconcile;
pub mod view;

pub use reconcile::{parse_trades, positions_for_isin, reconcile_portfolio};
pub use view::{
    exposure_by_isin, portfolio_axes, IsinExposure, PortfolioAxe, PortfolioFilter,
    PortfolioOptions,
};
