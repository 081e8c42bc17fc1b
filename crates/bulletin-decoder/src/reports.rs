//! Grouped output of one decode call.

use std::collections::BTreeMap;
use std::fmt;

use wmo_common::{ReportKey, ReportType};

/// Message bodies per grouping key, in arrival order.
pub type ReportGroups = BTreeMap<ReportKey, Vec<String>>;

/// Reports split out of a raw input buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedReports {
    /// Reports grouped by type, then by station or source identity.
    pub reports: BTreeMap<ReportType, ReportGroups>,
    /// Per-bulletin problems; empty when every bulletin split cleanly.
    pub errors: String,
    /// Text found outside any bulletin frame.
    pub unmatched: String,
    /// Number of framed bulletins seen.
    pub bulletins: usize,
}

impl DecodedReports {
    pub(crate) fn push(&mut self, report_type: ReportType, key: ReportKey, body: String) {
        self.reports
            .entry(report_type)
            .or_default()
            .entry(key)
            .or_default()
            .push(body);
    }

    /// Drop groups whose label is blank, and types left without groups.
    pub(crate) fn purge_blank_keys(&mut self, report_type: ReportType) {
        if let Some(groups) = self.reports.get_mut(&report_type) {
            groups.retain(|key, _| !key.label.trim().is_empty());
            if groups.is_empty() {
                self.reports.remove(&report_type);
            }
        }
    }

    pub fn groups(&self, report_type: ReportType) -> Option<&ReportGroups> {
        self.reports.get(&report_type)
    }

    /// Total number of message bodies across all types.
    pub fn report_count(&self) -> usize {
        self.reports
            .values()
            .flat_map(|groups| groups.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.report_count() == 0
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Iterate `(type, key, body)` in type order, then key order, then
    /// arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (ReportType, &ReportKey, &str)> {
        self.reports.iter().flat_map(|(t, groups)| {
            groups.iter().flat_map(move |(key, bodies)| {
                bodies.iter().map(move |body| (*t, key, body.as_str()))
            })
        })
    }
}

/// Human-readable dump used by test mode.
impl fmt::Display for DecodedReports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (report_type, groups) in &self.reports {
            writeln!(f, " ---- {} BEGIN ----", report_type)?;
            for (key, bodies) in groups {
                match &key.extra {
                    Some(extra) => writeln!(f, "<<{}>> ({})", key.label, extra)?,
                    None => writeln!(f, "<<{}>>", key.label)?,
                }
                for body in bodies {
                    writeln!(f, "[{}]", body)?;
                }
                writeln!(f)?;
            }
            writeln!(f, " ---- {} END ----", report_type)?;
        }

        if !self.errors.is_empty() {
            writeln!(f, "------- ERRORS (BEGIN) -------")?;
            write!(f, "{}", self.errors)?;
            writeln!(f, "------- ERRORS (END) -------")?;
        }

        if !self.unmatched.trim().is_empty() {
            writeln!(f, "------- NOT MATCHED (BEGIN) -------")?;
            writeln!(f, "{}", self.unmatched)?;
            writeln!(f, "------- NOT MATCHED (END) -------")?;
        }

        Ok(())
    }
}
