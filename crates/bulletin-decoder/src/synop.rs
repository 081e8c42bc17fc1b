//! SYNOP (FM 12/13/14) splitting.
//!
//! A section line `AAXX|BBXX|OOXX YYGGi [ident]` opens a new identity that
//! applies to the reports after it. Mobile land stations (`OOXX`) are
//! skipped. NIL reports are dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use wmo_common::{ReportKey, ReportType};

use crate::reader::ReportReader;
use crate::reports::DecodedReports;

static SECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^( *((AA|BB|OO)XX +(\d{4}\S)? *(\w+)?))?(.*)$").expect("valid SYNOP regex")
});

static NIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)? *NIL *=?\s*$").expect("valid NIL regex"));

pub(crate) fn split(text: &str, out: &mut DecodedReports) {
    let mut ident = String::new();
    let mut mobile = false;

    for report in ReportReader::new(text) {
        let report = report.trim_end();
        let Some(caps) = SECTION.captures(report) else {
            continue;
        };

        if let Some(section) = caps.get(2).filter(|m| !m.as_str().is_empty()) {
            ident = section.as_str().to_string();
            mobile = caps.get(3).map(|m| m.as_str()) == Some("OO");
        }

        let body = caps.get(6).map(|m| m.as_str()).unwrap_or_default();
        if body.is_empty() || mobile || ident.is_empty() {
            continue;
        }

        let body = body.trim();
        if NIL.is_match(body) {
            continue;
        }

        out.push(
            ReportType::Synop,
            ReportKey::prefixed(ident.clone()),
            body.to_string(),
        );
    }

    out.purge_blank_keys(ReportType::Synop);
}
