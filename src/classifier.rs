use crate::patterns::INTENT_KEYWORDS;

/// Decides whether a block of extracted text reads like a vendor asking
/// about payment status.
pub struct InquiryClassifier;

impl InquiryClassifier {
    /// Low-precision, high-recall gate: a false positive only wastes a
    /// drafted reply, a false negative silently drops a document. The
    /// scoring must not be tightened without re-checking recall against
    /// the keyword list.
    pub fn is_payment_inquiry(text: &str) -> bool {
        let low = text.to_lowercase();
        let score = INTENT_KEYWORDS
            .iter()
            .filter(|keyword| low.contains(*keyword))
            .count();
        (low.contains("invoice") && score >= 1) || score >= 2
    }
}
