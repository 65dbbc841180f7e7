//! OSINT aggregator — binary entrypoint.
//! Loads `config.json` (or `$OSINT_CONFIG_PATH`), polls every configured
//! source once (or every `poll_interval` seconds), post-processes the
//! aggregate and writes it to the output file.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use osint_aggregator::metrics::Metrics;
use osint_aggregator::scheduler::{run_cycle, spawn_poll_scheduler};
use osint_aggregator::{build_engine, AggregatorConfig, Credentials, ResultSink};

/// `RUST_LOG` controls the filter (default `info`);
/// `OSINT_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("OSINT_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Tokens may live in a local .env; absent file is fine.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(target: "osint", "Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let cfg = AggregatorConfig::load_default().context("loading configuration")?;

    let credentials = Credentials::install_global(Credentials::from_env(
        cfg.sources.iter().map(|s| s.name.as_str()),
    ));
    let engine = Arc::new(build_engine(&cfg, credentials).context("building HTTP client")?);
    let sink = Arc::new(ResultSink::from_config(&cfg));

    let Some(interval) = cfg.poll_interval_duration() else {
        run_cycle(&engine, &sink).await?;
        return Ok(());
    };

    if let Some(addr) = cfg.metrics_addr.as_deref() {
        let metrics = Metrics::init(cfg.cache_ttl)?;
        let (bound, _server) = metrics.serve(addr).await?;
        info!(target: "osint", %bound, "serving /metrics");
    }

    info!(
        target: "osint",
        interval_secs = interval.as_secs(),
        "polling mode; Ctrl-C to stop"
    );
    let poller = spawn_poll_scheduler(engine, sink, interval);
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    poller.abort();
    info!(target: "osint", "shutting down");
    Ok(())
}
