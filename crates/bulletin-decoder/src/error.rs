//! Error types for bulletin decoding.

use thiserror::Error;

/// Reasons a single bulletin cannot be split.
///
/// These never abort a decode; they end up in the error log of the
/// bulletin that caused them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("binary payload does not start with BUFR (got {0:?})")]
    MissingBufrSignature(String),
}

/// Result type for decode operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
