use serde::{Deserialize, Serialize};

/// Environment variables honored as overrides.
const ENV_URL: &str = "SUPABASE_URL";
const ENV_KEY: &str = "SUPABASE_ANON_KEY";
const ENV_BUCKET: &str = "BUCKET_NAME";
const ENV_PREFIX: &str = "BUCKET_PREFIX";

/// The original recursion-depth control capped out at 10.
pub const MAX_DEPTH_LIMIT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage/database endpoint, e.g. https://xyzcompany.supabase.co
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_key: String,
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    pub table: String,
    pub max_depth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            supabase_url: String::new(),
            supabase_key: String::new(),
            bucket: "vendor-inquiries".to_string(),
            prefix: String::new(),
            table: "invoices".to_string(),
            max_depth: 6,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Fill credentials and bucket settings from the process environment.
    /// Environment values win over the file so secrets stay out of YAML.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_URL) {
            if !url.is_empty() {
                self.supabase_url = url;
            }
        }
        if let Ok(key) = std::env::var(ENV_KEY) {
            if !key.is_empty() {
                self.supabase_key = key;
            }
        }
        if let Ok(bucket) = std::env::var(ENV_BUCKET) {
            if !bucket.is_empty() {
                self.bucket = bucket;
            }
        }
        if let Ok(prefix) = std::env::var(ENV_PREFIX) {
            self.prefix = prefix;
        }
    }

    /// Reject a run before any listing happens when the endpoint or key is
    /// missing; every later stage assumes connectivity is configured.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.supabase_url.is_empty() || self.supabase_key.is_empty() {
            anyhow::bail!(
                "storage not configured: set {ENV_URL} and {ENV_KEY} (or supabase_url/supabase_key in the config file)"
            );
        }
        Ok(())
    }

    pub fn clamped_max_depth(&self) -> u32 {
        self.max_depth.min(MAX_DEPTH_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bucket, "vendor-inquiries");
        assert_eq!(config.table, "invoices");
        assert_eq!(config.max_depth, 6);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config {
            supabase_url: "https://example.supabase.co".to_string(),
            supabase_key: "anon-key".to_string(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.supabase_url, config.supabase_url);
        assert_eq!(parsed.bucket, config.bucket);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_serde_defaults() {
        let parsed: Config =
            serde_yaml::from_str("bucket: docs\ntable: invoices\nmax_depth: 3\n").unwrap();
        assert_eq!(parsed.bucket, "docs");
        assert!(parsed.supabase_url.is_empty());
        assert!(parsed.prefix.is_empty());
    }

    #[test]
    fn test_max_depth_clamped() {
        let config = Config {
            max_depth: 40,
            ..Default::default()
        };
        assert_eq!(config.clamped_max_depth(), MAX_DEPTH_LIMIT);
    }
}
