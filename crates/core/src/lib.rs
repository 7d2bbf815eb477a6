//! Core types and configuration for the credit axes dashboard.
//!
//! This crate provides shared types used across all other crates:
//! - Quote, best-quote and trade records
//! - Rating classification and maturity bucketing
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod maturity;
pub mod rating;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use maturity::{bucket_for, bucketize, BucketedQuote};
pub use rating::{classify_quote, classify_rating};
pub use types::*;
