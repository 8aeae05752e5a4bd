use crate::patterns::PatternLibrary;
use std::collections::BTreeSet;

/// Punctuation trimmed from both ends of a captured invoice identifier.
const TRIM_CHARS: &str = ".,;: )(";

/// Minimum length of a normalized identifier; anything shorter is noise
/// from the bare-code pattern.
const MIN_ID_LEN: usize = 4;

/// Pulls candidate invoice identifiers and sender addresses out of
/// materialized document text.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    patterns: PatternLibrary,
}

impl Extractor {
    pub fn new() -> Self {
        Self {
            patterns: PatternLibrary::new(),
        }
    }

    /// Apply each invoice pattern in order to the lower-cased text. Captures
    /// are upper-cased, trimmed of surrounding punctuation, and kept in
    /// first-seen order across pattern-then-position; the same value never
    /// appears twice.
    pub fn extract_invoice_ids(&self, text: &str) -> Vec<String> {
        let low = text.to_lowercase();
        let mut found: Vec<String> = Vec::new();
        for rx in self.patterns.invoice_patterns() {
            for caps in rx.captures_iter(&low) {
                let Some(group) = caps.get(1) else { continue };
                let val = group
                    .as_str()
                    .to_uppercase()
                    .trim_matches(|c: char| TRIM_CHARS.contains(c))
                    .to_string();
                if val.len() >= MIN_ID_LEN && !found.contains(&val) {
                    found.push(val);
                }
            }
        }
        found
    }

    /// Collect every address matching the email pattern, de-duplicated and
    /// lexicographically sorted. The original casing is preserved.
    pub fn extract_emails(&self, text: &str) -> Vec<String> {
        let set: BTreeSet<String> = self
            .patterns
            .email_pattern()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();
        set.into_iter().collect()
    }
}
