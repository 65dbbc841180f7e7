//! Default post-processor: reads the aggregate from stdin, prints a summary
//! document to stdout and keeps a copy in `processed_data.json`.
//! Logs go to stderr so stdout stays pure JSON; ERROR lines are also
//! appended to `errors.log` in the working directory.

use std::fs::File;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use osint_aggregator::sink::summary::summarize;

const PROCESSED_PATH: &str = "processed_data.json";
const ERROR_LOG_PATH: &str = "errors.log";

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let error_file = match File::create(ERROR_LOG_PATH) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("cannot open {ERROR_LOG_PATH}: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(env_filter))
        .with(error_file.map(|f| {
            fmt::layer()
                .with_writer(Mutex::new(f))
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR)
        }))
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    match process() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn process() -> anyhow::Result<()> {
    let start = Instant::now();

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    let input: serde_json::Value =
        serde_json::from_str(&buffer).context("Failed to parse JSON")?;

    let output = serde_json::to_vec_pretty(&summarize(input))?;
    {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(&output)
            .and_then(|()| stdout.write_all(b"\n"))
            .context("Failed to write to stdout")?;
    }

    if let Err(e) = std::fs::write(PROCESSED_PATH, &output) {
        error!("Error saving to file: {e}");
    }

    info!("Processing completed in {:.2?}", start.elapsed());
    Ok(())
}
