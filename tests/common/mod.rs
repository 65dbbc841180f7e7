// tests/common/mod.rs
// Shared fixtures: an in-process HTTP server and scripted fetchers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use osint_aggregator::{FetchError, FetchResult, SourceDescriptor, SourceFetcher};
use serde_json::json;

/// Serve `router` on an ephemeral localhost port for the rest of the test.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    addr
}

/// What a scripted source does when fetched.
#[derive(Clone, Debug)]
pub enum Script {
    Ok(Duration),
    Fail(Duration),
    Panic,
}

/// Fetcher driven by a per-source script; counts calls and tracks how
/// many fetches were in flight at once.
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new<I: IntoIterator<Item = (&'static str, Script)>>(scripts: I) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every source succeeds immediately.
    pub fn always_ok() -> Self {
        Self::new(Vec::<(&'static str, Script)>::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .get(&source.name)
            .cloned()
            .unwrap_or(Script::Ok(Duration::ZERO));
        if let Script::Panic = script {
            panic!("scripted panic for {}", source.name);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let out = match script {
            Script::Ok(latency) => {
                tokio::time::sleep(latency).await;
                Ok(FetchResult {
                    source: source.name.clone(),
                    payload: json!({ "from": source.name }),
                })
            }
            Script::Fail(latency) => {
                tokio::time::sleep(latency).await;
                Err(FetchError::Status { status: 500 })
            }
            Script::Panic => unreachable!(),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        out
    }
}

pub fn sources(names: &[&str]) -> Vec<SourceDescriptor> {
    names
        .iter()
        .map(|n| SourceDescriptor::new(*n, format!("http://unused.invalid/{n}")))
        .collect()
}

pub fn sorted_names(results: &[FetchResult]) -> Vec<String> {
    let mut v: Vec<String> = results.iter().map(|r| r.source.clone()).collect();
    v.sort();
    v
}
