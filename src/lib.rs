// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod scheduler;
pub mod sink;

use std::sync::Arc;

// ---- Re-exports for stable public API ----
pub use crate::config::{AggregatorConfig, PostProcessorConfig};
pub use crate::engine::AggregationEngine;
pub use crate::error::{ConfigError, FetchError, OutputError, PostProcessError};
pub use crate::ingest::cache::{CacheEntry, SourceCache};
pub use crate::ingest::credentials::Credentials;
pub use crate::ingest::fetcher::HttpFetcher;
pub use crate::ingest::types::{AggregateResult, CacheKey, FetchResult, SourceDescriptor, SourceFetcher};
pub use crate::sink::ResultSink;

/// Wire an engine the way the binary does: HTTP fetcher with the configured
/// timeout, a fresh cache sized from config, rate limit and concurrency cap.
pub fn build_engine(
    cfg: &AggregatorConfig,
    credentials: Arc<Credentials>,
) -> Result<AggregationEngine, FetchError> {
    let fetcher = HttpFetcher::with_timeout(credentials, cfg.request_timeout_duration())?;
    let cache = SourceCache::new(cfg.cache_ttl_duration(), cfg.cache_maxsize);
    Ok(
        AggregationEngine::new(cfg.sources.clone(), Arc::new(fetcher), Arc::new(cache))
            .with_rate_limit(cfg.rate_limit_duration())
            .with_max_concurrency(cfg.max_concurrency.unwrap_or(0)),
    )
}
