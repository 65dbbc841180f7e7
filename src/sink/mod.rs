//! # Result Sink
//! Hands the aggregate to a post-processor and persists whatever comes back.
//!
//! Post-processing failures never abort a run: they are logged and the
//! output file is written with an empty array instead.

pub mod output;
pub mod process;
pub mod summary;

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{error, info};

use crate::config::AggregatorConfig;
use crate::error::{OutputError, PostProcessError};
use crate::ingest::types::FetchResult;

pub use process::{ExternalProcessor, Passthrough};

#[async_trait]
pub trait PostProcessor: Send + Sync {
    async fn process(&self, aggregate: &[FetchResult]) -> Result<Value, PostProcessError>;
    /// Short label for logs.
    fn name(&self) -> &str;
}

pub struct ResultSink {
    processor: Box<dyn PostProcessor>,
    output_path: PathBuf,
}

impl ResultSink {
    pub fn new(processor: Box<dyn PostProcessor>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            processor,
            output_path: output_path.into(),
        }
    }

    pub fn from_config(cfg: &AggregatorConfig) -> Self {
        let processor: Box<dyn PostProcessor> = match cfg.post_processor() {
            Some(p) => Box::new(ExternalProcessor::from_config(p)),
            None => Box::new(Passthrough),
        };
        Self::new(processor, cfg.output_path.clone())
    }

    /// Post-process, then overwrite the output file. Returns what was written.
    pub async fn deliver(&self, aggregate: &[FetchResult]) -> Result<Value, OutputError> {
        let processed = match self.processor.process(aggregate).await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    target: "osint",
                    processor = self.processor.name(),
                    error = %e,
                    "Error processing data with {}: {e}",
                    self.processor.name()
                );
                Value::Array(Vec::new())
            }
        };

        output::save_to_file(&self.output_path, &processed).await?;
        info!(
            target: "osint",
            path = %self.output_path.display(),
            "Data saved to {}",
            self.output_path.display()
        );
        Ok(processed)
    }
}
