// src/ingest/types.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// One configured data provider. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub name: String, // e.g. "Twitter", "Mastodon"
    pub endpoint: String,
    /// Query parameters. Sorted map, so iteration order is canonical.
    #[serde(default, deserialize_with = "scalar_map")]
    pub params: BTreeMap<String, String>,
    /// Request headers; values equal to the credential placeholder are
    /// swapped for the source's token before the request goes out.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Config files often carry numeric or boolean params (`"count": 50`);
/// they are sent as their textual form.
fn scalar_map<'de, D>(de: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = BTreeMap::deserialize(de)?;
    raw.into_iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(D::Error::custom(format!(
                        "param '{k}' must be a string, number or boolean, got {other}"
                    )))
                }
            };
            Ok((k, s))
        })
        .collect()
}

/// Deterministic cache key: source name plus the params serialized with
/// sorted keys, so `{a, b}` and `{b, a}` map to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_source(source: &SourceDescriptor) -> Self {
        let params = serde_json::to_string(&source.params).unwrap_or_default();
        Self(format!("{}_{}", source.name, params))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Successful response of one source. Failures never become data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchResult {
    pub source: String,
    #[serde(rename = "data")]
    pub payload: Value,
}

/// Successful results of one run, in completion order.
pub type AggregateResult = Vec<FetchResult>;

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Single attempt, no retries.
    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError>;
}
