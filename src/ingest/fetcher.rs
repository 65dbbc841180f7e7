// src/ingest/fetcher.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;

use crate::error::FetchError;
use crate::ingest::credentials::Credentials;
use crate::ingest::types::{FetchResult, SourceDescriptor, SourceFetcher};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("osint-aggregator/", env!("CARGO_PKG_VERSION"));

/// Issues one GET per source; the body must be JSON.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    credentials: Arc<Credentials>,
}

impl HttpFetcher {
    pub fn with_timeout(
        credentials: Arc<Credentials>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self {
            client,
            credentials,
        })
    }

    async fn fetch_once(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
        let mut req = self.client.get(&source.endpoint).query(&source.params);
        for (k, v) in self.credentials.resolve_headers(source) {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(FetchError::Request)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(FetchError::Body)?;
        let payload = serde_json::from_slice(&body).map_err(FetchError::Decode)?;
        Ok(FetchResult {
            source: source.name.clone(),
            payload,
        })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceDescriptor) -> Result<FetchResult, FetchError> {
        let t0 = std::time::Instant::now();
        let out = self.fetch_once(source).await;
        histogram!("osint_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("osint_fetch_total").increment(1);

        if let Err(e) = &out {
            tracing::error!(
                target: "osint",
                source = %source.name,
                error = %e,
                "Error fetching data from {}: {e}",
                source.name
            );
            counter!("osint_fetch_errors_total").increment(1);
        }
        out
    }
}
