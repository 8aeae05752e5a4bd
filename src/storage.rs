use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One entry from a single-level storage listing, as the listing API
/// returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl StorageEntry {
    /// File/directory inference over the listing API's shape: an entry with
    /// a real object id, or a metadata block carrying a size, is a file;
    /// everything else is a folder placeholder. The API exposes no
    /// authoritative flag, so the heuristic lives here and nowhere else.
    pub fn is_file(&self) -> bool {
        if self.id.as_deref().is_some_and(|id| !id.is_empty()) {
            return true;
        }
        self.metadata
            .as_ref()
            .is_some_and(|m| m.contains_key("size"))
    }

    pub fn size_hint(&self) -> Option<u64> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("size"))
            .and_then(|v| v.as_u64())
    }
}

/// Capability to list one directory level and fetch object bytes.
#[async_trait]
pub trait ObjectStore {
    /// List one level. `None`, `""` and `"/"` all mean the bucket root.
    async fn list_level(&self, prefix: Option<&str>) -> anyhow::Result<Vec<StorageEntry>>;

    async fn download(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Thin Supabase Storage wrapper; paginates up to 1000 entries per level
/// and sorts by name so traversal output is stable.
pub struct SupabaseStorage {
    client: Client,
    endpoint: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(endpoint: &str, api_key: &str, bucket: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("inquiry-reader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn list_level(&self, prefix: Option<&str>) -> anyhow::Result<Vec<StorageEntry>> {
        let prefix = match prefix {
            None | Some("") | Some("/") => "",
            Some(p) => p,
        };
        let url = format!("{}/storage/v1/object/list/{}", self.endpoint, self.bucket);
        let body = serde_json::json!({
            "prefix": prefix,
            "limit": 1000,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });

        log::debug!("Listing bucket {} prefix {prefix:?}", self.bucket);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("listing request for prefix {prefix:?} failed"))?
            .error_for_status()
            .with_context(|| format!("listing prefix {prefix:?} rejected by storage"))?;

        let entries: Vec<StorageEntry> = response
            .json()
            .await
            .context("malformed listing response")?;
        Ok(entries)
    }

    async fn download(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let url = format!("{}/storage/v1/object/{}/{}", self.endpoint, self.bucket, path);

        log::debug!("Downloading {path} from bucket {}", self.bucket);
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("download request for {path} failed"))?
            .error_for_status()
            .with_context(|| format!("download of {path} rejected by storage"))?;

        Ok(response.bytes().await?.to_vec())
    }
}
