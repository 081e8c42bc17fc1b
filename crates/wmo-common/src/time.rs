//! Timestamp formatting for spool, dump and retry file names.

use chrono::{DateTime, Utc};

/// Compact ISO timestamp used in file names, e.g. `20240101T120000`.
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

/// File timestamp for the current instant.
pub fn now_timestamp() -> String {
    file_timestamp(Utc::now())
}
