use regex::Regex;

/// One disqualifying pattern. Any single match rejects the whole message;
/// there is no scoring.
struct NoiseRule {
    name: &'static str,
    pattern: Regex,
}

/// Rejects messages matching known non-transactional signatures.
///
/// Runs before amount extraction so that failed-transaction notices carrying
/// currency figures never reach the amount extractor.
pub struct NoiseFilter {
    rules: Vec<NoiseRule>,
}

impl NoiseFilter {
    pub fn new() -> Self {
        let table: &[(&'static str, &'static str)] = &[
            ("otp", r"(?i)\b(?:one[\s-]?time\s+pass(?:word|code)|otp)\b"),
            (
                "declined",
                r"(?i)\b(?:declined|failed|unsuccessful|could\s+not\s+be\s+(?:processed|completed))\b",
            ),
            ("reversal", r"(?i)\b(?:revers(?:ed|al)|charge\s?back)\b"),
            ("auto-generated", r"(?i)\bauto[\s-]?generated\b"),
            ("test", r"(?i)\btest\s+transaction\b"),
            ("mandate", r"(?i)\bmandate\b"),
        ];
        let rules = table
            .iter()
            .map(|(name, pattern)| NoiseRule {
                name,
                pattern: Regex::new(pattern).expect("invalid noise pattern"),
            })
            .collect();
        Self { rules }
    }

    /// Returns the name of the first matching disqualifier, if any.
    pub fn rejects(&self, text: &str) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.name)
    }

    pub fn is_noise(&self, text: &str) -> bool {
        self.rejects(text).is_some()
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new()
    }
}
