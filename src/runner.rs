use crate::classifier::InquiryClassifier;
use crate::drafter::{draft_email, title_case, DraftEmail};
use crate::extractor::Extractor;
use crate::materializer::TextMaterializer;
use crate::resolver::{InvoiceTable, RecordResolver};
use crate::storage::ObjectStore;
use chrono::Utc;
use serde::Serialize;

/// Identifier stamped into the one-off "needs invoice number" reply.
pub const PLACEHOLDER_INVOICE_NO: &str = "(not provided)";

/// One row of the per-run log. Appended once per (file, invoice id) pair,
/// or once per file when no id was found. Lives only for the run.
#[derive(Debug, Clone, Serialize)]
pub struct RunLogEntry {
    pub file: String,
    pub invoice_no: Option<String>,
    pub status: String,
    pub action: String,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct DraftedReply {
    pub invoice_no: String,
    pub vendor_email: Option<String>,
    pub email: DraftEmail,
}

#[derive(Debug, Clone)]
pub enum FileOutcome {
    DownloadFailed(String),
    /// No extractor available, or extraction yielded nothing. A warning,
    /// not an error.
    Unparseable,
    /// Parsed fine but failed the inquiry gate. Informational only.
    NotAnInquiry,
    LookupFailed(String),
    Drafted(Vec<DraftedReply>),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub invoice_ids: Vec<String>,
    pub vendor_email: Option<String>,
    pub outcome: FileOutcome,
}

/// Sequences the pipeline per selected file: download, materialize,
/// classify, extract, resolve, draft, log. One file completes before the
/// next begins; a failure skips that item and moves on.
pub struct Runner {
    extractor: Extractor,
    materializer: TextMaterializer,
}

impl Runner {
    pub fn new() -> Self {
        Self {
            extractor: Extractor::new(),
            materializer: TextMaterializer::new(),
        }
    }

    pub async fn process_files<S, T>(
        &self,
        store: &S,
        table: &T,
        paths: &[String],
    ) -> (Vec<FileReport>, Vec<RunLogEntry>)
    where
        S: ObjectStore + Sync,
        T: InvoiceTable + Sync,
    {
        let mut reports = Vec::with_capacity(paths.len());
        let mut log_entries = Vec::new();
        for path in paths {
            let report = self.process_file(store, table, path, &mut log_entries).await;
            reports.push(report);
        }
        (reports, log_entries)
    }

    /// Process one file, appending its log rows to the shared accumulator.
    pub async fn process_file<S, T>(
        &self,
        store: &S,
        table: &T,
        path: &str,
        log_entries: &mut Vec<RunLogEntry>,
    ) -> FileReport
    where
        S: ObjectStore + Sync,
        T: InvoiceTable + Sync,
    {
        let bytes = match store.download(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Download failed for {path}: {e}");
                return report(path, vec![], None, FileOutcome::DownloadFailed(e.to_string()));
            }
        };

        let extension = path.rsplit('.').next().unwrap_or("").to_lowercase();
        let text = self.materializer.extract_text(&bytes, &extension);
        if text.is_empty() {
            log::warn!("Could not parse {path}; skipping");
            return report(path, vec![], None, FileOutcome::Unparseable);
        }

        if !InquiryClassifier::is_payment_inquiry(&text) {
            log::info!("{path} does not look like a payment inquiry; skipping");
            return report(path, vec![], None, FileOutcome::NotAnInquiry);
        }

        let invoice_ids = self.extractor.extract_invoice_ids(&text);
        let emails = self.extractor.extract_emails(&text);
        // Deliberate simple tie-break: the lexicographically smallest
        // candidate is "the" vendor email.
        let vendor_email = emails.first().cloned();

        log::info!(
            "{path}: {} invoice id(s), vendor email {}",
            invoice_ids.len(),
            vendor_email.as_deref().unwrap_or("—")
        );

        if invoice_ids.is_empty() {
            let email = draft_email("Vendor", vendor_email.as_deref(), PLACEHOLDER_INVOICE_NO, None);
            log_entries.push(RunLogEntry {
                file: path.to_string(),
                invoice_no: None,
                status: "Unknown".to_string(),
                action: "Drafted – needs invoice number".to_string(),
                timestamp: utc_timestamp(),
            });
            let reply = DraftedReply {
                invoice_no: PLACEHOLDER_INVOICE_NO.to_string(),
                vendor_email: vendor_email.clone(),
                email,
            };
            return report(path, invoice_ids, vendor_email, FileOutcome::Drafted(vec![reply]));
        }

        // One lookup per file, not per run: the same id in another file is
        // queried again.
        let lookup = match RecordResolver::resolve(table, &invoice_ids).await {
            Ok(lookup) => lookup,
            Err(e) => {
                log::error!("Invoice lookup failed for {path}: {e}");
                return report(
                    path,
                    invoice_ids,
                    vendor_email,
                    FileOutcome::LookupFailed(e.to_string()),
                );
            }
        };

        let mut replies = Vec::with_capacity(invoice_ids.len());
        for invoice_no in &invoice_ids {
            let record = lookup.get(invoice_no);
            let vendor_name = record
                .and_then(|r| r.supplier_name.as_deref())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback_vendor_name(vendor_email.as_deref()));
            let email = draft_email(&vendor_name, vendor_email.as_deref(), invoice_no, record);
            log_entries.push(RunLogEntry {
                file: path.to_string(),
                invoice_no: Some(invoice_no.clone()),
                status: record
                    .and_then(|r| r.status.clone())
                    .unwrap_or_else(|| "Not Found".to_string()),
                action: "Drafted".to_string(),
                timestamp: utc_timestamp(),
            });
            replies.push(DraftedReply {
                invoice_no: invoice_no.clone(),
                vendor_email: vendor_email.clone(),
                email,
            });
        }

        report(path, invoice_ids, vendor_email, FileOutcome::Drafted(replies))
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

fn report(
    path: &str,
    invoice_ids: Vec<String>,
    vendor_email: Option<String>,
    outcome: FileOutcome,
) -> FileReport {
    FileReport {
        path: path.to_string(),
        invoice_ids,
        vendor_email,
        outcome,
    }
}

/// Title-cased local part of the detected address, or the generic
/// fallback when no address was found.
fn fallback_vendor_name(vendor_email: Option<&str>) -> String {
    match vendor_email.and_then(|e| e.split('@').next()) {
        Some(local) if !local.is_empty() => title_case(local),
        _ => "Vendor".to_string(),
    }
}

/// ISO-8601 UTC with a trailing literal `Z`, microsecond precision.
fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Render the run log as delimited text with the export header.
pub fn render_csv(entries: &[RunLogEntry]) -> String {
    let mut out = String::from("file,invoice_no,status,action,timestamp\n");
    for entry in entries {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&entry.file),
            csv_field(entry.invoice_no.as_deref().unwrap_or("")),
            csv_field(&entry.status),
            csv_field(&entry.action),
            csv_field(&entry.timestamp),
        ));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::InvoiceRecord;
    use crate::storage::StorageEntry;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeStore {
        objects: HashMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list_level(&self, _prefix: Option<&str>) -> anyhow::Result<Vec<StorageEntry>> {
            Ok(vec![])
        }

        async fn download(&self, path: &str) -> anyhow::Result<Vec<u8>> {
            self.objects
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("object not found: {path}"))
        }
    }

    struct FakeTable {
        rows: Vec<InvoiceRecord>,
    }

    #[async_trait]
    impl InvoiceTable for FakeTable {
        async fn query_by_keys(&self, keys: &[String]) -> anyhow::Result<Vec<InvoiceRecord>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| {
                    r.supplier_invoice_no
                        .as_deref()
                        .is_some_and(|k| keys.iter().any(|q| q == k))
                })
                .cloned()
                .collect())
        }
    }

    fn html(body: &str) -> Vec<u8> {
        format!("<html><body>{body}</body></html>").into_bytes()
    }

    fn store(objects: &[(&str, Vec<u8>)]) -> FakeStore {
        FakeStore {
            objects: objects
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_resolved_invoice_drafts_and_logs() {
        let store = store(&[(
            "inbox/a.html",
            html("Invoice No: AB-1234. What is the payment status? Contact ap@acme.com"),
        )]);
        let table = FakeTable {
            rows: vec![InvoiceRecord {
                supplier_invoice_no: Some("AB-1234".to_string()),
                supplier_name: Some("Acme Corp".to_string()),
                status: Some("Paid".to_string()),
                ..Default::default()
            }],
        };

        let runner = Runner::new();
        let (reports, log) = runner
            .process_files(&store, &table, &["inbox/a.html".to_string()])
            .await;

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].invoice_no.as_deref(), Some("AB-1234"));
        assert_eq!(log[0].status, "Paid");
        assert_eq!(log[0].action, "Drafted");
        assert!(log[0].timestamp.ends_with('Z'));

        match &reports[0].outcome {
            FileOutcome::Drafted(replies) => {
                assert_eq!(replies.len(), 1);
                assert!(replies[0].email.body.starts_with("Hi Acme Corp,"));
                assert!(replies[0].email.body.contains("remittance advice"));
            }
            other => panic!("Expected drafted outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unresolved_invoice_uses_not_found() {
        let store = store(&[(
            "a.html",
            html("Invoice No: ZZ-9999, has it been paid? Contact billing@vendor.io"),
        )]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let (reports, log) = runner
            .process_files(&store, &table, &["a.html".to_string()])
            .await;

        assert_eq!(log[0].status, "Not Found");
        match &reports[0].outcome {
            FileOutcome::Drafted(replies) => {
                assert!(replies[0].email.body.contains("couldn't find invoice ZZ-9999"));
                // No record: vendor name falls back to the email local part.
                assert!(replies[0].email.body.starts_with("Hi Billing,"));
            }
            other => panic!("Expected drafted outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_invoice_id_logs_placeholder_entry() {
        let store = store(&[(
            "a.html",
            html("Invoice payment status please — no reference included"),
        )]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let (reports, log) = runner
            .process_files(&store, &table, &["a.html".to_string()])
            .await;

        assert_eq!(log.len(), 1);
        assert!(log[0].invoice_no.is_none());
        assert_eq!(log[0].status, "Unknown");
        assert_eq!(log[0].action, "Drafted – needs invoice number");
        match &reports[0].outcome {
            FileOutcome::Drafted(replies) => {
                assert_eq!(replies[0].invoice_no, PLACEHOLDER_INVOICE_NO);
                assert!(replies[0].email.body.starts_with("Hi Vendor,"));
            }
            other => panic!("Expected drafted outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_inquiry_is_skipped_without_log_entry() {
        let store = store(&[("a.html", html("Quarterly newsletter and product updates"))]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let (reports, log) = runner
            .process_files(&store, &table, &["a.html".to_string()])
            .await;

        assert!(log.is_empty());
        assert!(matches!(reports[0].outcome, FileOutcome::NotAnInquiry));
    }

    #[tokio::test]
    async fn test_empty_text_is_unparseable() {
        let store = store(&[("a.html", b"<html><body></body></html>".to_vec())]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let (reports, log) = runner
            .process_files(&store, &table, &["a.html".to_string()])
            .await;

        assert!(log.is_empty());
        assert!(matches!(reports[0].outcome, FileOutcome::Unparseable));
    }

    #[tokio::test]
    async fn test_download_failure_does_not_abort_batch() {
        let store = store(&[(
            "good.html",
            html("Invoice No: AB-1234, payment status? ap@acme.com"),
        )]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let paths = vec!["missing.html".to_string(), "good.html".to_string()];
        let (reports, log) = runner.process_files(&store, &table, &paths).await;

        assert!(matches!(reports[0].outcome, FileOutcome::DownloadFailed(_)));
        assert!(matches!(reports[1].outcome, FileOutcome::Drafted(_)));
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_one_log_entry_per_extracted_id() {
        let store = store(&[(
            "a.html",
            html("Invoice #AA-1111 and invoice no. BB-2222: payment status please"),
        )]);
        let table = FakeTable { rows: vec![] };

        let runner = Runner::new();
        let (_, log) = runner
            .process_files(&store, &table, &["a.html".to_string()])
            .await;

        let logged: Vec<&str> = log.iter().filter_map(|e| e.invoice_no.as_deref()).collect();
        assert_eq!(logged, vec!["AA-1111", "BB-2222"]);
    }

    #[test]
    fn test_csv_rendering_escapes_fields() {
        let entries = vec![RunLogEntry {
            file: "inbox/a,b.html".to_string(),
            invoice_no: Some("AB-1234".to_string()),
            status: "On Hold".to_string(),
            action: "Drafted".to_string(),
            timestamp: "2024-01-01T00:00:00.000000Z".to_string(),
        }];
        let csv = render_csv(&entries);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("file,invoice_no,status,action,timestamp"));
        assert_eq!(
            lines.next(),
            Some("\"inbox/a,b.html\",AB-1234,On Hold,Drafted,2024-01-01T00:00:00.000000Z")
        );
    }

    #[test]
    fn test_fallback_vendor_name() {
        assert_eq!(fallback_vendor_name(Some("ap.team@acme.com")), "Ap.Team");
        assert_eq!(fallback_vendor_name(None), "Vendor");
    }
}
