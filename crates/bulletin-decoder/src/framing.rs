//! Bulletin framing.
//!
//! A bulletin starts with `ZCZC`, optionally followed by a sequence number,
//! on a line of its own. It ends with a run of at least three CR/LF
//! characters, `NNNN`, and a CR/LF run ending in a line feed. A bulletin
//! missing its end marker extends to the end of the input, less a
//! trailing `NNNN` line.

use once_cell::sync::Lazy;
use regex::bytes::Regex;

const START_MARKER: &[u8] = b"ZCZC";
const MARKER_RUN: &[u8] = b" 0123456789\r\n";

static END_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n]{3,}NNNN[\r\n]*\n").expect("valid end marker regex"));

// A short end marker is only honoured at the very end of the input.
static TRAILING_END_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\A|[\r\n]+)NNNN[\r\n]*\z").expect("valid trailing end marker regex")
});

/// One framed bulletin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bulletin<'a> {
    /// Trimmed start line, e.g. `ZCZC 123`.
    pub zczc_line: String,
    /// Bytes between the start line and the end marker.
    pub body: &'a [u8],
}

/// Iterator over the bulletins in a raw input buffer.
///
/// Bytes outside any bulletin are collected and available through
/// [`Framer::unmatched`] once iteration is done.
pub struct Framer<'a> {
    input: &'a [u8],
    pos: usize,
    unmatched: Vec<u8>,
}

impl<'a> Framer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            unmatched: Vec::new(),
        }
    }

    /// Text found outside bulletins so far.
    pub fn unmatched(&self) -> String {
        String::from_utf8_lossy(&self.unmatched).into_owned()
    }

    /// Locate the next valid start marker. Returns the marker start and the
    /// offset just past its marker run.
    fn find_start(&mut self) -> Option<(usize, usize)> {
        loop {
            let rest = &self.input[self.pos..];
            let Some(offset) = find_subslice(rest, START_MARKER) else {
                self.unmatched.extend_from_slice(rest);
                self.pos = self.input.len();
                return None;
            };

            let start = self.pos + offset;
            let mut end = start + START_MARKER.len();
            while end < self.input.len() && MARKER_RUN.contains(&self.input[end]) {
                end += 1;
            }

            self.unmatched.extend_from_slice(&self.input[self.pos..start]);

            if self.input[end - 1] == b'\n' {
                return Some((start, end));
            }

            // Not a start line; keep it as unmatched text and search on.
            self.unmatched.extend_from_slice(&self.input[start..end]);
            self.pos = end;
        }
    }
}

impl<'a> Iterator for Framer<'a> {
    type Item = Bulletin<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.input.len() {
            let (start, body_start) = self.find_start()?;
            let zczc_line = String::from_utf8_lossy(&self.input[start..body_start])
                .trim()
                .to_string();

            let rest = &self.input[body_start..];
            let (body, consumed) = match END_MARKER.find(rest) {
                Some(m) => (&rest[..m.start()], m.end()),
                None => match TRAILING_END_MARKER.find(rest) {
                    Some(m) => (&rest[..m.start()], rest.len()),
                    None => (rest, rest.len()),
                },
            };
            self.pos = body_start + consumed;

            if body.is_empty() {
                continue;
            }

            return Some(Bulletin { zczc_line, body });
        }
        None
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
