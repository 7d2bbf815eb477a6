//! Error types for the axes dashboard.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the axes dashboard.
///
/// Only infrastructure failures surface here. Malformed rows are dropped by
/// the cleaning steps and never become an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source workbook could not be opened or parsed.
    #[error("Source error: {0}")]
    Source(String),

    /// A required sheet is absent from the workbook.
    #[error("Missing sheet: {0}")]
    MissingSheet(String),

    /// A required column is absent from a table.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Data error (structurally unusable input).
    #[error("Data error: {0}")]
    Data(String),

    /// Export error.
    #[error("Export error: {0}")]
    Export(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a source read error.
    pub fn source(msg: impl Into<String>) -> Self {
        Error::Source(msg.into())
    }

    /// Create a missing sheet error.
    pub fn missing_sheet(name: impl Into<String>) -> Self {
        Error::MissingSheet(name.into())
    }

    /// Create a missing column error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Error::MissingColumn(name.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an export error.
    pub fn export(msg: impl Into<String>) -> Self {
        Error::Export(msg.into())
    }

    /// Whether the error comes from reading the source rather than from the data.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Error::Source(_) | Error::MissingSheet(_) | Error::Io(_))
    }
}
