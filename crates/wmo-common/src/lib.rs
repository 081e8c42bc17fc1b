//! Common types and utilities shared across the WMO bulletin collector.

pub mod definitions;
pub mod error;
pub mod report;
pub mod time;

pub use definitions::{ReportDefinition, ReportDefinitions};
pub use error::{WmoError, WmoResult};
pub use report::{ReportKey, ReportType};
pub use time::{file_timestamp, now_timestamp};
