//! Report reader: yields the `=`-terminated reports of a text bulletin.

/// Iterator over the reports in the text following a bulletin header.
///
/// Each report gathers lines (CR removed, right-trimmed) up to and
/// including the first line holding `=`; anything after the `=` on that
/// line is dropped. A non-blank unterminated tail is returned as the last
/// report.
pub struct ReportReader<'a> {
    rest: &'a str,
}

impl<'a> ReportReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl<'a> Iterator for ReportReader<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let text = self.rest.trim_start_matches([' ', '\t', '\r', '\n']);
        if text.is_empty() {
            self.rest = text;
            return None;
        }

        let mut report = String::new();
        let mut remaining = text;

        while !remaining.is_empty() {
            let (raw_line, after) = match remaining.find('\n') {
                Some(i) => (&remaining[..i], &remaining[i + 1..]),
                None => (remaining, ""),
            };
            remaining = after;

            let line = raw_line.replace('\r', "");
            let line = line.trim_end();

            if let Some(i) = line.find('=') {
                report.push_str(&line[..=i]);
                report.push('\n');
                self.rest = remaining;
                return Some(report);
            }

            report.push_str(line);
            report.push('\n');
        }

        self.rest = "";
        if report.trim().is_empty() {
            None
        } else {
            Some(report)
        }
    }
}
