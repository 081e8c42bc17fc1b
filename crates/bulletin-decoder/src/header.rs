//! Abbreviated heading (`TTAAii CCCC YYGGgg [BBB]`) extraction and
//! report type classification.

use once_cell::sync::Lazy;
use regex::Regex;
use wmo_common::ReportType;

/// Header patterns, checked in order. The first full match wins.
static HEADER_TABLE: Lazy<Vec<(ReportType, Regex)>> = Lazy::new(|| {
    [
        (ReportType::Synop, r"^ *S(I|M|N)\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Metar, r"^ *S(A|P)\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Temp, r"^ *U(E|F|K|L|M|S|Z)\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Pilo, r"^ *U(G|H|I|P|Q|Y)\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Arep, r"^ *U(A|D)\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Drau, r"^ *SS\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Bath, r"^ *SO\w{4} +\w+ +\d+ *\w*$"),
        (ReportType::Tide, r"^ *ISRZ(?:\w{2})+ +\w+ +\d+ *\w*$"),
        (ReportType::BufrSurface, r"^ *IS(I|M|N)\w{3} +\w+ +\d+ *\w*$"),
    ]
    .into_iter()
    .map(|(t, p)| (t, Regex::new(p).expect("valid header regex")))
    .collect()
});

/// Classify a header line.
pub fn classify(header: &str) -> Option<ReportType> {
    HEADER_TABLE
        .iter()
        .find(|(_, re)| re.is_match(header))
        .map(|(t, _)| *t)
}

/// Split a bulletin body into its header and the bytes after it.
///
/// Leading whitespace is skipped. The header is the run of ASCII
/// alphanumerics and spaces that starts the first line; the remainder of
/// that line and any following whitespace are dropped.
pub fn split_header(body: &[u8]) -> (String, &[u8]) {
    let mut pos = skip_whitespace(body, 0);

    let start = pos;
    while pos < body.len() && (body[pos].is_ascii_alphanumeric() || body[pos] == b' ') {
        pos += 1;
    }
    let header = String::from_utf8_lossy(&body[start..pos]).into_owned();

    while pos < body.len() && body[pos] != b'\n' {
        pos += 1;
    }
    pos = skip_whitespace(body, pos);

    (header, &body[pos..])
}

fn skip_whitespace(buf: &[u8], mut pos: usize) -> usize {
    while pos < buf.len() && matches!(buf[pos], b' ' | b'\t' | b'\r' | b'\n') {
        pos += 1;
    }
    pos
}
