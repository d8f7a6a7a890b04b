use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

const DEFAULT_STDERR_FILTER: &str = "info";

/// Install the process-wide subscriber for one run.
///
/// Every event at debug or above is appended to `path` as NDJSON. Stderr
/// gets a compact copy filtered by `RUST_LOG`.
pub fn init_run_logging(path: &Path) -> RegistryResult<()> {
    let log_file = OpenOptions::new().create(true).append(true).open(path)?;

    let ndjson = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_current_span(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(LevelFilter::DEBUG);

    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(stderr_filter());

    tracing_subscriber::registry()
        .with(ndjson)
        .with(console)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

fn stderr_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_STDERR_FILTER))
}
