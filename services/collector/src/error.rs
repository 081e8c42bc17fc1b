//! Error types for report delivery.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while sending reports or handling the retry queue.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The endpoint could not be reached; the link is considered down.
    #[error("Endpoint {endpoint} unreachable: {message}")]
    LinkDown { endpoint: String, message: String },

    #[error("No endpoint configured")]
    NoEndpoint,

    #[error("Retry queue I/O failed for {path}: {source}")]
    QueueIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free file name for {0} in the retry queue")]
    NameExhausted(String),
}

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;
