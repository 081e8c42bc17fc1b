//! Error types shared by the collector crates.

use thiserror::Error;

/// Result type alias using WmoError.
pub type WmoResult<T> = Result<T, WmoError>;

/// Errors raised while interpreting report types and definitions.
#[derive(Debug, Error)]
pub enum WmoError {
    #[error("Unknown WMO report type: {0}")]
    UnknownReportType(String),

    #[error("Invalid report definition '{definition}': {message}")]
    InvalidDefinition { definition: String, message: String },
}
