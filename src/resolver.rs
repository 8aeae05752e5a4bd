use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::time::Duration;

/// Identifiers per equality-in-set query.
pub const BATCH_SIZE: usize = 50;

/// Column the store keys invoices by.
pub const KEY_FIELD: &str = "Supplier_Invoice_No";

/// Read-only snapshot of one row of the invoice-status table. Absent
/// columns are explicit options, never missing-key lookups.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceRecord {
    #[serde(rename = "Supplier_Invoice_No", default)]
    pub supplier_invoice_no: Option<String>,
    #[serde(rename = "Supplier_Name", default)]
    pub supplier_name: Option<String>,
    #[serde(rename = "Invoice_Date", default)]
    pub invoice_date: Option<String>,
    #[serde(rename = "Supplier_Invoice_Date", default)]
    pub supplier_invoice_date: Option<String>,
    // The store is inconsistent about whether amounts are numeric or text.
    #[serde(rename = "Total_Invoice_Amount", default, deserialize_with = "string_or_number")]
    pub total_invoice_amount: Option<String>,
    #[serde(rename = "Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(rename = "Comments", default)]
    pub comments: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Capability for equality-in-set queries against the invoice table.
#[async_trait]
pub trait InvoiceTable {
    async fn query_by_keys(&self, keys: &[String]) -> anyhow::Result<Vec<InvoiceRecord>>;
}

/// Thin PostgREST wrapper over the hosted invoice table.
pub struct SupabaseTable {
    client: Client,
    endpoint: String,
    api_key: String,
    table: String,
}

impl SupabaseTable {
    pub fn new(endpoint: &str, api_key: &str, table: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("inquiry-reader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        })
    }
}

#[async_trait]
impl InvoiceTable for SupabaseTable {
    async fn query_by_keys(&self, keys: &[String]) -> anyhow::Result<Vec<InvoiceRecord>> {
        let quoted: Vec<String> = keys.iter().map(|k| format!("\"{k}\"")).collect();
        let filter = format!("in.({})", quoted.join(","));
        let url = format!("{}/rest/v1/{}", self.endpoint, self.table);

        log::debug!("Querying {} for {} keys", self.table, keys.len());
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .query(&[("select", "*"), (KEY_FIELD, filter.as_str())])
            .send()
            .await
            .with_context(|| format!("invoice query against {} failed", self.table))?
            .error_for_status()
            .with_context(|| format!("invoice query rejected by {}", self.table))?;

        let rows: Vec<InvoiceRecord> = response
            .json()
            .await
            .context("malformed invoice query response")?;
        Ok(rows)
    }
}

/// Batched lookup of extracted identifiers against the invoice table.
pub struct RecordResolver;

impl RecordResolver {
    /// Issue one query per batch of 50 identifiers and merge the rows into
    /// a map keyed by the upper-cased value of the row's own key column —
    /// the store's stored case is not trusted to match the extractor's.
    /// Identifiers with no matching row are simply absent.
    pub async fn resolve<T: InvoiceTable + Sync + ?Sized>(
        table: &T,
        ids: &[String],
    ) -> anyhow::Result<HashMap<String, InvoiceRecord>> {
        let mut out: HashMap<String, InvoiceRecord> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }

        for batch in ids.chunks(BATCH_SIZE) {
            let rows = table.query_by_keys(batch).await?;
            for row in rows {
                let Some(key) = row.supplier_invoice_no.as_deref() else {
                    continue;
                };
                let key = key.to_uppercase();
                // Input ids are deduplicated, so batches are disjoint;
                // earlier rows win if the store ever returns a duplicate.
                out.entry(key).or_insert(row);
            }
        }
        Ok(out)
    }
}
