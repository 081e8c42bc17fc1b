//! Report definitions: which report types are collected and which
//! downstream decoder receives them.

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{WmoError, WmoResult};
use crate::report::ReportType;

/// Mapping of one report type to a decoder identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDefinition {
    pub report_type: ReportType,
    pub decoder: String,
}

impl ReportDefinition {
    /// Parse a `TYPE[:decoder]` entry.
    ///
    /// The type name is case-insensitive. A missing or blank decoder falls
    /// back to the lowercased type name.
    pub fn parse(entry: &str) -> WmoResult<Self> {
        let (type_part, decoder_part) = match entry.split_once(':') {
            Some((t, d)) => (t, Some(d)),
            None => (entry, None),
        };

        if type_part.trim().is_empty() {
            return Err(WmoError::InvalidDefinition {
                definition: entry.to_string(),
                message: "missing report type".to_string(),
            });
        }

        let report_type: ReportType = type_part.parse()?;
        let decoder = decoder_part
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| report_type.default_decoder());

        Ok(Self {
            report_type,
            decoder,
        })
    }
}

/// Immutable set of report definitions loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDefinitions {
    by_type: BTreeMap<ReportType, String>,
}

impl Default for ReportDefinitions {
    fn default() -> Self {
        let mut by_type = BTreeMap::new();
        by_type.insert(ReportType::Synop, ReportType::Synop.default_decoder());
        Self { by_type }
    }
}

impl ReportDefinitions {
    /// Build definitions from configuration entries.
    ///
    /// Unknown or malformed entries are logged and skipped. When a type is
    /// listed twice the later entry wins. An empty result falls back to
    /// `SYNOP:synop`.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Self {
        let mut by_type = BTreeMap::new();

        for entry in entries {
            let entry = entry.as_ref();
            if entry.trim().is_empty() {
                continue;
            }
            match ReportDefinition::parse(entry) {
                Ok(def) => {
                    if let Some(previous) = by_type.insert(def.report_type, def.decoder) {
                        warn!(
                            report_type = %def.report_type,
                            previous = %previous,
                            "Report type defined twice, using the last definition"
                        );
                    }
                }
                Err(e) => {
                    warn!(entry = %entry, error = %e, "Ignoring report definition");
                }
            }
        }

        if by_type.is_empty() {
            return Self::default();
        }

        Self { by_type }
    }

    /// Report types the decoder should keep.
    pub fn wanted_types(&self) -> BTreeSet<ReportType> {
        self.by_type.keys().copied().collect()
    }

    /// Decoder identity configured for a report type.
    pub fn decoder_for(&self, report_type: ReportType) -> Option<&str> {
        self.by_type.get(&report_type).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = ReportDefinition> + '_ {
        self.by_type.iter().map(|(t, d)| ReportDefinition {
            report_type: *t,
            decoder: d.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
