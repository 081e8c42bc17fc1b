//! Bulletin dispatch: frame, classify and split.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use wmo_common::ReportType;

use crate::framing::{Bulletin, Framer};
use crate::header::{classify, split_header};
use crate::reports::DecodedReports;
use crate::{bufr, metar, synop};

/// Splits raw bulletin input into reports of the wanted types.
///
/// Decoding is stateless across calls: every call starts with an empty
/// result and error log.
#[derive(Debug, Clone, Default)]
pub struct BulletinDecoder {
    wanted: BTreeSet<ReportType>,
}

impl BulletinDecoder {
    /// Decoder keeping only `wanted` types. An empty set keeps every type.
    pub fn new(wanted: BTreeSet<ReportType>) -> Self {
        Self { wanted }
    }

    pub fn wants(&self, report_type: ReportType) -> bool {
        self.wanted.is_empty() || self.wanted.contains(&report_type)
    }

    pub fn split(&self, raw: &[u8]) -> DecodedReports {
        let mut out = DecodedReports::default();
        let mut framer = Framer::new(raw);

        for bulletin in framer.by_ref() {
            out.bulletins += 1;
            self.dispatch(&bulletin, &mut out);
        }

        out.unmatched = framer.unmatched();
        if !out.unmatched.trim().is_empty() {
            debug!(bytes = out.unmatched.len(), "Text outside bulletin frames");
        }
        out
    }

    fn dispatch(&self, bulletin: &Bulletin<'_>, out: &mut DecodedReports) {
        let (header, rest) = split_header(bulletin.body);
        if header.is_empty() {
            return;
        }

        let Some(report_type) = classify(&header) else {
            debug!(zczc = %bulletin.zczc_line, header = %header, "Unknown bulletin header");
            return;
        };

        if !self.wants(report_type) {
            return;
        }

        match report_type {
            ReportType::Synop => synop::split(&String::from_utf8_lossy(rest), out),
            ReportType::Metar => metar::split(&String::from_utf8_lossy(rest), out),
            ReportType::Temp
            | ReportType::Pilo
            | ReportType::Arep
            | ReportType::Drau
            | ReportType::Bath
            | ReportType::Tide => {
                out.errors
                    .push_str(&format!("{}: not implemented: {}\n", report_type, header));
            }
            ReportType::BufrSurface => {
                if let Err(e) = bufr::split(&bulletin.zczc_line, &header, rest, out) {
                    warn!(zczc = %bulletin.zczc_line, header = %header, error = %e, "Cannot split bulletin");
                    out.errors.push_str(&format!(
                        "ERROR: can't split bulletin segment[\n{}]\n",
                        String::from_utf8_lossy(bulletin.body)
                    ));
                }
            }
        }
    }
}

/// Split `raw` keeping only `wanted` types (all types when empty).
pub fn split(raw: &[u8], wanted: &BTreeSet<ReportType>) -> DecodedReports {
    BulletinDecoder::new(wanted.clone()).split(raw)
}
