// SORTSWEEP MEASUREMENT EXTRACTOR
// PULLS ONE LABELED TIMING VALUE OUT OF FREE-FORM PROGRAM OUTPUT.
//
// GRAMMAR: <anything><LABEL><anything>:<number>[ms[ <anything>]]
// LINES ARE SCANNED TOP TO BOTTOM. ON EACH LINE THE FIRST LABEL (IN PRIORITY
// ORDER) THAT OCCURS DECIDES HOW THE LINE IS READ. THE FIRST LINE THAT PARSES
// WINS. A LINE THAT MATCHES BUT DOES NOT PARSE IS SKIPPED, NOT FATAL.

use std::sync::OnceLock;

use regex::Regex;

// NON-NEGATIVE DECIMAL WITH OPTIONAL EXPONENT, OPTIONAL "ms" SUFFIX.
// TEXT AFTER THE UNIT ("12.5 ms (avg)") IS IGNORED; WITHOUT A UNIT IT IS NOT.
fn value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*((?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][-+]?[0-9]+)?)\s*(?:ms(?:\s.*)?)?\s*$")
            .expect("value pattern is valid")
    })
}

/// A caller-declared, ordered list of markers such as `"Total Execution Time"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extractor {
    labels: Vec<String>,
}

impl Extractor {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn extract(&self, text: &str) -> Option<f64> {
        extract(text, &self.labels)
    }
}

/// Scan `text` for the first line carrying one of `labels` and parse the
/// number after its colon. Pure: the same input always yields the same value.
pub fn extract<S: AsRef<str>>(text: &str, labels: &[S]) -> Option<f64> {
    text.lines().find_map(|line| {
        let label = labels
            .iter()
            .map(AsRef::as_ref)
            .find(|l| !l.is_empty() && line.contains(*l))?;
        parse_after_label(line, label)
    })
}

fn parse_after_label(line: &str, label: &str) -> Option<f64> {
    let pos = line.find(label)?;
    let rest = &line[pos + label.len()..];
    // LABEL MAY BE GIVEN WITH OR WITHOUT ITS COLON ("Execution Time:" VS "Execution Time")
    let value = if label.ends_with(':') {
        rest
    } else {
        let colon = rest.find(':')?;
        &rest[colon + 1..]
    };
    let caps = value_re().captures(value)?;
    let parsed: f64 = caps.get(1)?.as_str().parse().ok()?;
    if parsed.is_finite() {
        Some(parsed)
    } else {
        None
    }
}
