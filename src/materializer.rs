use regex::Regex;

/// Whether a PDF text extractor was compiled in. Resolved once at startup;
/// the pipeline only ever asks the materializer, never the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfCapability {
    Available,
    Unavailable,
}

/// Turns downloaded document bytes into plain text, dispatching purely on
/// the file extension. Anything it cannot handle yields an empty string —
/// the orchestrator treats empty text as "skip, unparseable".
#[derive(Debug, Clone)]
pub struct TextMaterializer {
    pdf: PdfCapability,
    script_style_pattern: Regex,
    tag_pattern: Regex,
    whitespace_pattern: Regex,
}

impl TextMaterializer {
    pub fn new() -> Self {
        Self {
            pdf: detect_pdf_capability(),
            script_style_pattern: Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
                .unwrap(),
            tag_pattern: Regex::new(r"<[^>]*>").unwrap(),
            whitespace_pattern: Regex::new(r"\s+").unwrap(),
        }
    }

    pub fn pdf_capability(&self) -> PdfCapability {
        self.pdf
    }

    pub fn extract_text(&self, bytes: &[u8], extension: &str) -> String {
        match extension.to_lowercase().as_str() {
            "pdf" => self.read_pdf(bytes),
            "html" | "htm" => self.read_html(bytes),
            other => {
                log::debug!("No text extractor for extension {other:?}");
                String::new()
            }
        }
    }

    fn read_pdf(&self, bytes: &[u8]) -> String {
        if self.pdf == PdfCapability::Unavailable {
            log::debug!("PDF extractor not compiled in, skipping");
            return String::new();
        }
        extract_pdf_text(bytes)
    }

    /// Lossy UTF-8 decode, drop script/style blocks, strip tags, decode the
    /// common entities, collapse inter-element whitespace to single spaces.
    fn read_html(&self, bytes: &[u8]) -> String {
        let html = String::from_utf8_lossy(bytes);
        let text = self.script_style_pattern.replace_all(&html, " ");
        let text = self.tag_pattern.replace_all(&text, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'");
        let text = self.whitespace_pattern.replace_all(&text, " ");
        text.trim().to_string()
    }
}

impl Default for TextMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "pdf")]
fn detect_pdf_capability() -> PdfCapability {
    PdfCapability::Available
}

#[cfg(not(feature = "pdf"))]
fn detect_pdf_capability() -> PdfCapability {
    PdfCapability::Unavailable
}

#[cfg(feature = "pdf")]
fn extract_pdf_text(bytes: &[u8]) -> String {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => {
            log::debug!("Extracted {} chars from PDF", text.len());
            text
        }
        Err(e) => {
            log::debug!("Failed to extract PDF text: {e}");
            String::new()
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf_text(_bytes: &[u8]) -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_tags_stripped() {
        let m = TextMaterializer::new();
        let html = b"<html><body><p>Invoice  status</p><div>please</div></body></html>";
        assert_eq!(m.extract_text(html, "html"), "Invoice status please");
    }

    #[test]
    fn test_html_script_and_style_dropped() {
        let m = TextMaterializer::new();
        let html = b"<style>p { color: red }</style><script>var x = 1;</script><p>kept</p>";
        assert_eq!(m.extract_text(html, "htm"), "kept");
    }

    #[test]
    fn test_html_entities_decoded() {
        let m = TextMaterializer::new();
        let html = b"<p>Smith&nbsp;&amp;&nbsp;Co</p>";
        assert_eq!(m.extract_text(html, "html"), "Smith & Co");
    }

    #[test]
    fn test_html_invalid_utf8_is_lossy() {
        let m = TextMaterializer::new();
        let mut html = b"<p>pay".to_vec();
        html.push(0xFF);
        html.extend_from_slice(b"ment</p>");
        let text = m.extract_text(&html, "html");
        assert!(text.starts_with("pay"));
        assert!(text.ends_with("ment"));
    }

    #[test]
    fn test_unknown_extension_yields_empty() {
        let m = TextMaterializer::new();
        assert_eq!(m.extract_text(b"anything", "docx"), "");
    }

    #[test]
    fn test_extension_case_insensitive() {
        let m = TextMaterializer::new();
        assert_eq!(m.extract_text(b"<b>hi</b>", "HTML"), "hi");
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn test_pdf_without_extractor_yields_empty() {
        let m = TextMaterializer::new();
        assert_eq!(m.pdf_capability(), PdfCapability::Unavailable);
        assert_eq!(m.extract_text(b"%PDF-1.4", "pdf"), "");
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_garbage_pdf_degrades_to_empty() {
        let m = TextMaterializer::new();
        assert_eq!(m.pdf_capability(), PdfCapability::Available);
        assert_eq!(m.extract_text(b"not a pdf at all", "pdf"), "");
    }
}
