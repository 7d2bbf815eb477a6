//! Data ingestion and normalization for the axes dashboard.
//!
//! This crate handles:
//! - Workbook reading and content-keyed caching
//! - Raw cell coercion (quantities, yields, dates)
//! - Quote normalization of the dealer runs
//! - Watchlist import
//! - Template-based workbook export

pub mod coerce;
pub mod columns;
pub mod export;
pub mod loader;
pub mod normalizer;
pub mod table;
pub mod watchlist;
pub mod workbook;

pub use export::{export_rows, read_export, to_raw_table, ExportRow, ExportValue};
pub use loader::{LoaderStats, WorkbookLoader};
pub use normalizer::{derive_sector, CleanedQuotes, QuoteNormalizer};
pub use table::{RawRow, RawTable, RawValue};
pub use watchlist::Watchlist;
pub use workbook::{read_headerless, read_sheet};
