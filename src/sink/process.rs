// src/sink/process.rs
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::PostProcessor;
use crate::config::PostProcessorConfig;
use crate::error::PostProcessError;
use crate::ingest::types::FetchResult;

/// Runs an executable with the aggregate as JSON on stdin and parses its
/// stdout as the processed result. Non-zero exit is a failure.
#[derive(Debug, Clone)]
pub struct ExternalProcessor {
    program: String,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
}

impl ExternalProcessor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
        }
    }

    /// Run the child in `dir` instead of the caller's working directory.
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn from_config(cfg: &PostProcessorConfig) -> Self {
        Self::new(cfg.command.clone(), cfg.args.clone())
    }
}

#[async_trait]
impl PostProcessor for ExternalProcessor {
    async fn process(&self, aggregate: &[FetchResult]) -> Result<Value, PostProcessError> {
        let input = serde_json::to_vec(aggregate).map_err(PostProcessError::Serialize)?;

        let mut cmd = Command::new(&self.program);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        let mut child = cmd
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PostProcessError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PostProcessError::Stdin(io::Error::other("stdin not captured")))?;

        // Feed stdin while draining stdout/stderr, so a chatty child cannot
        // block on a full pipe.
        let write = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(PostProcessError::Wait)?;

        if !output.status.success() {
            return Err(PostProcessError::ExitStatus {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        match written {
            // A processor may legitimately exit without reading all input.
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                return Err(PostProcessError::Stdin(e))
            }
            _ => {}
        }

        serde_json::from_slice(&output.stdout).map_err(PostProcessError::InvalidOutput)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// No external step: the aggregate itself is the output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl PostProcessor for Passthrough {
    async fn process(&self, aggregate: &[FetchResult]) -> Result<Value, PostProcessError> {
        serde_json::to_value(aggregate).map_err(PostProcessError::Serialize)
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
