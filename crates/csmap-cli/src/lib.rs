//! cs-client-map Library
//!
//! Summarizes which clients touched which parts of the filesystem, from the
//! NetApp Cloud Secure activity API.
//!
//! # Overview
//!
//! A run fetches every activity in a time window, page by page, with a pool of
//! concurrent workers, and reduces each record to an `accessLocation<TAB>path`
//! key with the path cut to a configurable depth. The unique keys are printed
//! to standard output; progress goes to standard error.
//!
//! - [`api`]: HTTP client for the activity endpoint
//! - [`engine`]: pagination planner, worker pool and aggregation
//! - [`config`]: flag, environment and config file resolution
//! - [`progress`]: progress observers
//! - [`report`]: output formatting

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod report;

// Re-export commonly used types
pub use error::{CliError, Result};

use crate::api::ApiClient;
use crate::config::{ConfigFile, Settings};
use crate::engine::planner::{DEFAULT_PATH_DEPTH, DEFAULT_WORKERS};
use crate::engine::Planner;
use crate::progress::TerminalProgress;
use clap::Parser;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Project home, printed with the version
pub const HOMEPAGE: &str = "https://github.com/ybizeul/cs-client-map";

/// cs-client-map - list client/path pairs from Cloud Secure activities
#[derive(Parser, Debug)]
#[command(name = "cs-client-map")]
#[command(about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version and exit
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Configuration file path [default: ./config.yaml]
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Cloud Secure endpoint for the instance, i.e. 'psxxx.cs01.cloudinsights.netapp.com'
    #[arg(short = 'e', long = "endpoint", env = "CS_API_ENDPOINT")]
    pub endpoint: Option<String>,

    /// API key used to authenticate with the Cloud Secure service
    #[arg(short = 'k', long = "api-key", env = "CS_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of concurrent workers
    #[arg(short = 'w', long = "workers", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Path depth to output
    #[arg(short = 'p', long = "depth", default_value_t = DEFAULT_PATH_DEPTH)]
    pub depth: usize,

    /// From time, Unix ms timestamp [default: yesterday at 00:00]
    #[arg(short = 'f', long = "from", allow_negative_numbers = true)]
    pub from: Option<i64>,

    /// To time, Unix ms timestamp [default: today at 00:00]
    #[arg(short = 't', long = "to", allow_negative_numbers = true)]
    pub to: Option<i64>,

    /// Print keys in lexical order
    #[arg(long)]
    pub sort: bool,

    /// Verbose (debug) logging on standard error
    #[arg(long)]
    pub verbose: bool,
}

/// `cs-client-map vX.Y.Z (homepage)`
pub fn version_line() -> String {
    format!(
        "cs-client-map v{} ({})",
        env!("CARGO_PKG_VERSION"),
        HOMEPAGE
    )
}

/// Resolve settings, run the aggregation and print the report
pub async fn run(cli: &Cli) -> Result<()> {
    let file = ConfigFile::discover(cli.config.as_deref())?;
    let settings = Settings::resolve(cli, &file)?;

    info!(
        endpoint = %settings.endpoint,
        from = settings.from,
        to = settings.to,
        workers = settings.workers,
        depth = settings.depth,
        "Starting run"
    );

    let client = ApiClient::new(&settings.endpoint, settings.api_key.clone())?;
    let observer = Arc::new(TerminalProgress::new(settings.from, settings.to));
    let planner = Planner::new(Arc::new(client), observer);

    let summary = planner.run(&settings.plan()).await?;
    let keys = if settings.sort {
        summary.store.into_sorted_keys()
    } else {
        summary.store.into_keys()
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let lines = report::write_keys(&mut out, keys)?;

    info!(lines, total_records = summary.total_records, "Report written");
    Ok(())
}
