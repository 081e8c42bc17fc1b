//! METAR/SPECI splitting. Reports are grouped under the `METAR` or
//! `SPECI` keyword that last introduced them.

use once_cell::sync::Lazy;
use regex::Regex;
use wmo_common::{ReportKey, ReportType};

use crate::reader::ReportReader;
use crate::reports::DecodedReports;

static METAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^( *(METAR|SPECI))?(.*)$").expect("valid METAR regex"));

pub(crate) fn split(text: &str, out: &mut DecodedReports) {
    let mut ident = String::new();

    for report in ReportReader::new(text) {
        let Some(caps) = METAR.captures(&report) else {
            continue;
        };

        if let Some(kind) = caps.get(2) {
            ident = kind.as_str().to_string();
        }

        let body = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
        if body.is_empty() {
            continue;
        }

        out.push(
            ReportType::Metar,
            ReportKey::prefixed(ident.clone()),
            body.to_string(),
        );
    }

    out.purge_blank_keys(ReportType::Metar);
}
