use serde::{Deserialize, Serialize};

/// Configuration for the gateway request pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Reserved path prefix, without separators (`ipfs` serves `/ipfs/...`).
    pub prefix: String,
    /// File names served in place of a directory listing, in priority order.
    pub index_names: Vec<String>,
    /// Name of the response cache generation.
    pub cache_generation: String,
    /// Fall back to the file extension when sniffing finds nothing.
    pub guess_from_extension: bool,
    /// Limits for warming the cache from directory listings.
    pub prefetch: PrefetchConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            prefix: "ipfs".into(),
            index_names: vec!["index.html".into()],
            cache_generation: "dagway-v1".into(),
            guess_from_extension: true,
            prefetch: PrefetchConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// The absolute path the gateway is mounted at, e.g. `/ipfs`.
    pub fn mount_point(&self) -> String {
        format!("/{}", self.prefix.trim_matches('/'))
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() || prefix.contains('/') {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        if let Some(bad) = self
            .index_names
            .iter()
            .find(|n| n.is_empty() || n.contains('/'))
        {
            return Err(ConfigError::InvalidIndexName(bad.clone()));
        }
        if self.cache_generation.is_empty() {
            return Err(ConfigError::EmptyGeneration);
        }
        Ok(())
    }
}

/// Sibling files fetched into the cache when a directory listing is served.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Maximum files fetched per listing. Zero disables prefetching.
    pub max_files: usize,
    /// Files larger than this are skipped.
    pub max_bytes: u64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            max_files: 16,
            max_bytes: 256 * 1024,
        }
    }
}

/// Invalid gateway configuration.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("prefix must be a single non-empty path segment, got {0:?}")]
    InvalidPrefix(String),

    #[error("index name must be a non-empty file name, got {0:?}")]
    InvalidIndexName(String),

    #[error("cache generation must not be empty")]
    EmptyGeneration,
}
