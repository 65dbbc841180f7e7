// src/config/aggregator.rs
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::error::ConfigError;
use crate::ingest::types::SourceDescriptor;

pub const ENV_CONFIG_PATH: &str = "OSINT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_OUTPUT_PATH: &str = "osint_aggregated_data.json";
pub const DEFAULT_POST_PROCESSOR: &str = "./target/release/osint_processor";

fn default_rate_limit() -> u64 {
    5
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_cache_maxsize() -> usize {
    100
}
fn default_request_timeout() -> u64 {
    30
}
fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}
fn default_post_processor() -> Option<PostProcessorConfig> {
    Some(PostProcessorConfig {
        command: DEFAULT_POST_PROCESSOR.to_string(),
        args: Vec::new(),
    })
}

/// External executable that filters the aggregate (stdin JSON -> stdout JSON).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostProcessorConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    pub sources: Vec<SourceDescriptor>,
    /// Per-task delay in seconds.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default = "default_cache_maxsize")]
    pub cache_maxsize: usize,
    /// Unbounded when absent or 0.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// `null` (or an empty command) writes the raw aggregate.
    #[serde(default = "default_post_processor")]
    pub post_processor: Option<PostProcessorConfig>,
    /// Seconds between runs; a single run when absent.
    #[serde(default)]
    pub poll_interval: Option<u64>,
    /// `host:port` for the Prometheus endpoint (polling mode only).
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl AggregatorConfig {
    /// `$OSINT_CONFIG_PATH`, falling back to `config.json` in the CWD.
    pub fn default_path() -> PathBuf {
        env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_file(Self::default_path())
    }

    /// Load from JSON, or TOML when the extension says so.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::parse_str(&content, &ext)
    }

    pub fn parse_str(s: &str, hint_ext: &str) -> Result<Self, ConfigError> {
        let doc: serde_json::Value = if hint_ext == "toml" {
            toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?
        };

        if doc.get("sources").is_none() {
            return Err(ConfigError::MissingSources);
        }

        let cfg: Self =
            serde_json::from_value(doc).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for s in &self.sources {
            if s.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source with empty name".into()));
            }
            if !seen.insert(s.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name '{}'",
                    s.name
                )));
            }
        }
        if self.poll_interval == Some(0) {
            return Err(ConfigError::Invalid("poll_interval must be > 0".into()));
        }
        Ok(())
    }

    pub fn rate_limit_duration(&self) -> Duration {
        Duration::from_secs(self.rate_limit)
    }

    pub fn cache_ttl_duration(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn poll_interval_duration(&self) -> Option<Duration> {
        self.poll_interval.map(Duration::from_secs)
    }

    pub fn post_processor(&self) -> Option<&PostProcessorConfig> {
        self.post_processor
            .as_ref()
            .filter(|p| !p.command.trim().is_empty())
    }
}
