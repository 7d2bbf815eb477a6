//! Analytics over cleaned dealer axes.
//!
//! This crate provides:
//! - Best-quote selection and the load-and-clean pipeline
//! - Interactive axe filters and watchlist cross-reference
//! - Flow aggregation by bucket and category
//! - Issuer curves with Nelson-Siegel fitting
//! - Bond search and per-dealer detail
//! - Session state shared by the dashboard views

pub mod best_quote;
pub mod crossref;
pub mod curve;
pub mod filter;
pub mod flow;
pub mod pipeline;
pub mod search;
pub mod session;

pub use best_quote::select_best;
pub use crossref::{cross_reference, CrossMode};
pub use curve::{
    fit_curve, is_subordinated, issuer_groups, CurveMetric, CurvePoint, FittedCurve, IssuerCurveQuery,
};
pub use filter::{default_tolerance, slider_range, AxeFilter, FilterOptions, Range};
pub use flow::{
    flow_bars, flow_summary, quantity_heatmap, FlowBar, FlowDimension, FlowMeasure, Heatmap,
};
pub use pipeline::{load_and_clean, load_and_clean_at, load_and_clean_path, try_load};
pub use search::{bond_options, dealer_table, DealerRow};
pub use session::{Page, Session};
