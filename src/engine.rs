//! # Aggregation Engine
//! Fans out one task per configured source, collects whatever succeeds.
//!
//! Per task: cache lookup → (on miss) single fetch → mandatory rate-limit
//! delay → cache store on fresh success. The delay is applied uniformly after
//! the lookup/fetch step, whatever its outcome, so N concurrent sources cost
//! roughly `rate_limit + slowest fetch` of wall-clock time, not `N × rate_limit`.
//!
//! A failing or panicking source contributes nothing; every other source still
//! reports. Results are ordered by completion, not by config order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use metrics::{counter, gauge};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::FetchError;
use crate::ingest::cache::SourceCache;
use crate::ingest::types::{AggregateResult, CacheKey, FetchResult, SourceDescriptor, SourceFetcher};

pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(5);

pub struct AggregationEngine {
    sources: Vec<SourceDescriptor>,
    fetcher: Arc<dyn SourceFetcher>,
    cache: Arc<SourceCache>,
    rate_limit: Duration,
    max_concurrency: Option<usize>,
}

impl AggregationEngine {
    pub fn new(
        sources: Vec<SourceDescriptor>,
        fetcher: Arc<dyn SourceFetcher>,
        cache: Arc<SourceCache>,
    ) -> Self {
        Self {
            sources,
            fetcher,
            cache,
            rate_limit: DEFAULT_RATE_LIMIT,
            max_concurrency: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Cap the number of source tasks in flight. `0` means unbounded.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = (limit > 0).then_some(limit);
        self
    }

    pub fn rate_limit(&self) -> Duration {
        self.rate_limit
    }

    /// Dispatch every source concurrently and wait for all of them.
    /// No task outlives this call.
    pub async fn run(&self) -> AggregateResult {
        crate::ingest::ensure_metrics_described();
        info!(
            target: "osint",
            sources = self.sources.len(),
            rate_limit_secs = self.rate_limit.as_secs_f64(),
            "Starting OSINT aggregation..."
        );

        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();
        for source in &self.sources {
            let task = SourceTask {
                key: CacheKey::for_source(source),
                source: source.clone(),
                fetcher: Arc::clone(&self.fetcher),
                cache: Arc::clone(&self.cache),
                rate_limit: self.rate_limit,
            };
            let limiter = limiter.clone();
            tasks.spawn(async move {
                // The semaphore is never closed, so acquire only fails if it were.
                let _permit = match limiter {
                    Some(sem) => sem.acquire_owned().await.ok(),
                    None => None,
                };
                task.run().await
            });
        }

        let mut results = Vec::with_capacity(self.sources.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {}
                Err(e) => error!(target: "osint", error = %e, "source task did not complete"),
            }
        }

        counter!("osint_runs_total").increment(1);
        gauge!("osint_sources_with_data").set(results.len() as f64);
        gauge!("osint_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
        info!(
            target: "osint",
            with_data = results.len(),
            "Aggregated data from {} sources.",
            results.len()
        );
        results
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    Hit,
    Miss,
}

/// Everything one source task owns for the duration of a run.
struct SourceTask {
    source: SourceDescriptor,
    key: CacheKey,
    fetcher: Arc<dyn SourceFetcher>,
    cache: Arc<SourceCache>,
    rate_limit: Duration,
}

impl SourceTask {
    async fn run(self) -> Option<FetchResult> {
        let (result, lookup) = match AssertUnwindSafe(self.resolve()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(panic) => {
                let err = FetchError::Panicked(panic_message(panic.as_ref()));
                error!(
                    target: "osint",
                    source = %self.source.name,
                    error = %err,
                    "Error processing source {}: {err}",
                    self.source.name
                );
                (None, Lookup::Miss)
            }
        };

        // Mandatory per-task delay, applied on hit, miss and failure alike.
        tokio::time::sleep(self.rate_limit).await;

        if let (Lookup::Miss, Some(fresh)) = (lookup, &result) {
            self.cache.put(self.key.clone(), fresh.clone());
        }
        result
    }

    async fn resolve(&self) -> (Option<FetchResult>, Lookup) {
        if let Some(entry) = self.cache.get(&self.key) {
            info!(
                target: "osint",
                source = %self.source.name,
                "Using cached data for {}",
                self.source.name
            );
            counter!("osint_cache_hits_total").increment(1);
            return (Some(entry.value), Lookup::Hit);
        }

        counter!("osint_cache_misses_total").increment(1);
        match self.fetcher.fetch(&self.source).await {
            Ok(fresh) => (Some(fresh), Lookup::Miss),
            Err(e) => {
                // The fetcher already reported the failure.
                debug!(target: "osint", source = %self.source.name, error = %e, "no data");
                (None, Lookup::Miss)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceFetcher for Fixed {
        async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchResult {
                source: source.name.clone(),
                payload: json!({ "ok": true }),
            })
        }
    }

    #[test]
    fn builder_options() {
        let fetcher = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
        });
        let engine = AggregationEngine::new(vec![], fetcher, Arc::new(SourceCache::default()));
        assert_eq!(engine.rate_limit(), DEFAULT_RATE_LIMIT);
        let engine = engine
            .with_rate_limit(Duration::from_secs(1))
            .with_max_concurrency(0);
        assert_eq!(engine.rate_limit(), Duration::from_secs(1));
        assert_eq!(engine.max_concurrency, None);
        assert_eq!(engine.with_max_concurrency(3).max_concurrency, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_source_list_yields_empty_aggregate() {
        let fetcher = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
        });
        let engine = AggregationEngine::new(vec![], fetcher, Arc::new(SourceCache::default()));
        assert!(engine.run().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_is_served_from_cache() {
        let fetcher = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
        });
        let engine = AggregationEngine::new(
            vec![SourceDescriptor::new("A", "http://x/a")],
            fetcher.clone(),
            Arc::new(SourceCache::default()),
        )
        .with_rate_limit(Duration::from_secs(1));

        let first = engine.run().await;
        let second = engine.run().await;
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panic_messages() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
        let s: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic");
    }
}
