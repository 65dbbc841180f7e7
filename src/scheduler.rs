// src/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::AggregationEngine;
use crate::error::OutputError;
use crate::sink::ResultSink;

/// One full run: aggregate, post-process, persist. Returns the number of
/// sources that produced data.
pub async fn run_cycle(engine: &AggregationEngine, sink: &ResultSink) -> Result<usize, OutputError> {
    let results = engine.run().await;
    sink.deliver(&results).await?;
    Ok(results.len())
}

/// Run a cycle every `interval` until the handle is aborted. The engine's
/// cache carries over between cycles. A slow cycle delays the next tick
/// instead of bursting to catch up.
pub fn spawn_poll_scheduler(
    engine: Arc<AggregationEngine>,
    sink: Arc<ResultSink>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match run_cycle(&engine, &sink).await {
                Ok(with_data) => {
                    tracing::info!(target: "osint", with_data, "poll cycle finished");
                }
                Err(e) => {
                    tracing::error!(target: "osint", error = %e, "poll cycle failed to write output");
                }
            }
            counter!("osint_poll_cycles_total").increment(1);
        }
    })
}
