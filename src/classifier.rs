use regex::RegexSet;

/// Severity markers that make a chunk worth forwarding
pub const SEVERITY_MARKERS: [&str; 6] = [
    "error",
    "fatal",
    "exception",
    "failed",
    "timeout",
    "refused",
];

/// Decides whether a chunk of log output warrants forwarding
///
/// Matching is a case-insensitive substring test against [`SEVERITY_MARKERS`],
/// so "errorcode" matches "error". Holds only the compiled pattern set and
/// can be shared across followers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: RegexSet,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        let patterns = SEVERITY_MARKERS
            .iter()
            .map(|marker| format!("(?i){}", regex::escape(marker)));
        Self {
            patterns: RegexSet::new(patterns).expect("severity markers are valid patterns"),
        }
    }

    /// Returns true if the chunk contains any severity marker
    pub fn classify(&self, chunk: &str) -> bool {
        self.patterns.is_match(chunk)
    }
}
