//! Error taxonomy for the aggregator.
//!
//! Only [`ConfigError`] is fatal. Fetch and post-processing failures are
//! recovered where they happen and only surface as log lines.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("reading configuration from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing configuration: {0}")]
    Parse(String),

    #[error("configuration file must contain 'sources' key")]
    MissingSources,

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("reading response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum PostProcessError {
    #[error("spawning '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("writing aggregate to post-processor stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("waiting for post-processor: {0}")]
    Wait(#[source] std::io::Error),

    #[error("post-processor exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("post-processor output is not valid JSON: {0}")]
    InvalidOutput(#[source] serde_json::Error),

    #[error("serializing aggregate: {0}")]
    Serialize(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("serializing output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
