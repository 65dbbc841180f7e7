// src/ingest/credentials.rs
//! Per-source API tokens, read from the environment once at startup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::ingest::types::SourceDescriptor;

/// Header value in config files that stands for "this source's token".
pub const CREDENTIAL_PLACEHOLDER: &str = "YOUR_API_TOKEN";

/// Platforms that get a token looked up even when no config names them.
pub const KNOWN_PLATFORMS: [&str; 10] = [
    "Twitter",
    "Facebook",
    "YouTube",
    "Reddit",
    "Instagram",
    "LinkedIn",
    "TikTok",
    "Pinterest",
    "Telegram",
    "Mastodon",
];

static GLOBAL: OnceCell<Arc<Credentials>> = OnceCell::new();

/// Immutable source-name -> token table. Missing tokens resolve to "".
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    tokens: HashMap<String, String>,
}

impl Credentials {
    /// Read `<NAME>_API_TOKEN` for every known platform plus `extra_sources`.
    pub fn from_env<'a>(extra_sources: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_lookup(
            KNOWN_PLATFORMS.iter().copied().chain(extra_sources),
            |var| std::env::var(var).ok(),
        )
    }

    /// Build the table with a custom variable lookup (tests, alternate stores).
    pub fn from_lookup<'a, F>(sources: impl IntoIterator<Item = &'a str>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut tokens = HashMap::new();
        for name in sources {
            if let Some(tok) = lookup(&env_var_for(name)) {
                tokens.insert(name.to_string(), tok);
            }
        }
        Self { tokens }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Install the process-wide table. The first call wins; later calls
    /// return the already installed table unchanged.
    pub fn install_global(creds: Credentials) -> Arc<Credentials> {
        GLOBAL.get_or_init(|| Arc::new(creds)).clone()
    }

    /// Process-wide table, or an empty one if nothing was installed.
    pub fn global() -> Arc<Credentials> {
        GLOBAL.get_or_init(|| Arc::new(Credentials::default())).clone()
    }

    pub fn token_for(&self, source: &str) -> &str {
        self.tokens.get(source).map(String::as_str).unwrap_or("")
    }

    /// Headers of `source` with every placeholder value replaced.
    pub fn resolve_headers(&self, source: &SourceDescriptor) -> BTreeMap<String, String> {
        source
            .headers
            .iter()
            .map(|(k, v)| {
                let value = if v == CREDENTIAL_PLACEHOLDER {
                    self.token_for(&source.name).to_string()
                } else {
                    v.clone()
                };
                (k.clone(), value)
            })
            .collect()
    }
}

/// `Twitter` -> `TWITTER_API_TOKEN`, `Hacker News` -> `HACKER_NEWS_API_TOKEN`.
pub fn env_var_for(source: &str) -> String {
    let stem: String = source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}_API_TOKEN")
}
