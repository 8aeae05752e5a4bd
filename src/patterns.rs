use regex::Regex;

/// Keywords that signal the sender is asking about payment status.
/// Matched as plain lower-case substrings; each keyword counts at most once
/// toward the inquiry score regardless of repeat occurrences.
pub const INTENT_KEYWORDS: [&str; 12] = [
    "payment status",
    "paid?",
    "payment when",
    "remittance",
    "remittance advice",
    "payment date",
    "has it been paid",
    "when will i get paid",
    "invoice status",
    "payment confirmation",
    "receipt confirmation",
    "remit",
];

/// Compiled pattern set shared by the classifier and the extractor.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    invoice_patterns: Vec<Regex>,
    email_pattern: Regex,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self {
            // Order matters: matches from an earlier pattern keep their
            // position in extraction output even when a later pattern would
            // also hit the same text.
            invoice_patterns: vec![
                // Explicit prefix: "invoice #1234", "invoice no. 1234",
                // "invoice no: 1234", "invoice id: 1234"
                Regex::new(r"(?i)invoice\s*(?:#|no\.?:?|id:?)\s*([A-Z0-9\-_/]{4,})").unwrap(),
                // INV-prefixed numeric codes: INV-12345, INV_12345, INV12345
                Regex::new(r"(?i)\bINV[-_/]?(\d{4,})\b").unwrap(),
                // Bare 2-5 letter prefix followed by at least four digits
                Regex::new(r"(?i)\b([A-Z]{2,5}\d{4,})\b").unwrap(),
            ],
            email_pattern: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
        }
    }

    pub fn invoice_patterns(&self) -> &[Regex] {
        &self.invoice_patterns
    }

    pub fn email_pattern(&self) -> &Regex {
        &self.email_pattern
    }
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}
