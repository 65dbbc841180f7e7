// src/ingest/mod.rs
pub mod cache;
pub mod credentials;
pub mod fetcher;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("osint_runs_total", "Completed aggregation runs.");
        describe_counter!("osint_fetch_total", "HTTP fetches issued to sources.");
        describe_counter!(
            "osint_fetch_errors_total",
            "Fetches that failed (transport, status or JSON body)."
        );
        describe_counter!("osint_cache_hits_total", "Source tasks served from cache.");
        describe_counter!(
            "osint_cache_misses_total",
            "Source tasks that had to go to the network."
        );
        describe_counter!(
            "osint_cache_evictions_total",
            "Live entries evicted because the cache was full."
        );
        describe_histogram!("osint_fetch_ms", "Per-source fetch latency in milliseconds.");
        describe_gauge!(
            "osint_sources_with_data",
            "Sources that produced data in the last run."
        );
        describe_gauge!("osint_last_run_ts", "Unix ts when the last run finished.");
    });
}
