//! WMO report types and the key that groups decoded reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WmoError;

/// Report types recognised from the bulletin `TTAAii` header.
///
/// The declaration order is the header classification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    Synop,
    Metar,
    Temp,
    Pilo,
    Arep,
    Drau,
    Bath,
    Tide,
    BufrSurface,
}

impl ReportType {
    /// All report types in classification priority order.
    pub const ALL: [ReportType; 9] = [
        ReportType::Synop,
        ReportType::Metar,
        ReportType::Temp,
        ReportType::Pilo,
        ReportType::Arep,
        ReportType::Drau,
        ReportType::Bath,
        ReportType::Tide,
        ReportType::BufrSurface,
    ];

    /// Canonical upper-case name, as used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synop => "SYNOP",
            Self::Metar => "METAR",
            Self::Temp => "TEMP",
            Self::Pilo => "PILO",
            Self::Arep => "AREP",
            Self::Drau => "DRAU",
            Self::Bath => "BATH",
            Self::Tide => "TIDE",
            Self::BufrSurface => "BUFR_SURFACE",
        }
    }

    /// Decoder name used when a definition does not name one explicitly.
    pub fn default_decoder(&self) -> String {
        self.as_str().to_lowercase()
    }

    /// Whether the report body carries real content (vs. a header-only placeholder).
    pub fn is_implemented(&self) -> bool {
        matches!(self, Self::Synop | Self::Metar | Self::BufrSurface)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = WmoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        ReportType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| WmoError::UnknownReportType(s.trim().to_string()))
    }
}

/// Grouping key for decoded reports of one type.
///
/// `label` is the station/section identity (`AAXX 01001`, `METAR`,
/// `bufr_surface`), `extra` an optional transport tag appended to the
/// decoder name, and `prepend_label` tells whether the label must be put
/// in front of every message body before it is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportKey {
    pub label: String,
    pub extra: Option<String>,
    pub prepend_label: bool,
}

impl ReportKey {
    /// Key for text reports whose label goes in front of each body.
    pub fn prefixed(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extra: None,
            prepend_label: true,
        }
    }

    /// Key for self-describing payloads tagged with a transport hint.
    pub fn tagged(label: impl Into<String>, extra: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            extra: Some(extra.into()),
            prepend_label: false,
        }
    }

    /// Decoder key sent downstream: `decoder` or `decoder/extra`.
    pub fn decoder_key(&self, decoder: &str) -> String {
        match &self.extra {
            Some(extra) if !extra.is_empty() => format!("{}/{}", decoder, extra),
            _ => decoder.to_string(),
        }
    }

    /// Payload sent downstream for one message body. Prefixed payloads
    /// carry the label, a space and a line break before the body.
    pub fn payload(&self, body: &str) -> String {
        if self.prepend_label {
            format!("{} \n{}", self.label, body)
        } else {
            body.to_string()
        }
    }
}
