//! Configuration for a cs-client-map run
//!
//! Credentials come from, in order of precedence: command-line flags,
//! environment variables (`CS_API_ENDPOINT`, `CS_API_KEY`), then the YAML
//! config file. Clap resolves the first two; [`Settings::resolve`] falls back
//! to the file and fills in the time window.

use crate::engine::planner::{RunPlan, DEFAULT_PAGE_LIMIT};
use crate::error::{CliError, Result};
use crate::Cli;
use csmap_common::time::{today_midnight_ms, yesterday_midnight_ms};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Config file read when `-c` is not given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "./config.yaml";

/// Contents of the YAML config file
///
/// ```yaml
/// cs_api_endpoint: psxxx.cs01.cloudinsights.netapp.com
/// cs_api_key: eyJhbGciOi...
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "cs_api_endpoint", alias = "CS_API_ENDPOINT", default)]
    pub api_endpoint: Option<String>,

    #[serde(rename = "cs_api_key", alias = "CS_API_KEY", default)]
    pub api_key: Option<String>,
}

impl ConfigFile {
    /// Parse a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        // An empty file is an empty config, not a parse error.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content).map_err(|source| CliError::ConfigFile {
            path: path.display().to_string(),
            source,
        })
    }

    /// Load `explicit` if given (must exist), else the default file if present
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    debug!(path = DEFAULT_CONFIG_FILE, "No config file");
                    Ok(Self::default())
                }
            },
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub api_key: String,
    /// Window start, Unix milliseconds
    pub from: i64,
    /// Window end, Unix milliseconds
    pub to: i64,
    pub workers: usize,
    pub depth: usize,
    pub limit: u32,
    pub sort: bool,
}

impl Settings {
    /// Merge parsed flags with the config file and validate the result
    pub fn resolve(cli: &Cli, file: &ConfigFile) -> Result<Self> {
        let endpoint = first_non_empty(&cli.endpoint, &file.api_endpoint).ok_or_else(|| {
            CliError::config("Missing api endpoint as argument (-e) or CS_API_ENDPOINT env")
        })?;

        let api_key = first_non_empty(&cli.api_key, &file.api_key).ok_or_else(|| {
            CliError::config("Missing api key as argument (-k) or CS_API_KEY env")
        })?;

        let from = match cli.from {
            Some(from) => from,
            None => yesterday_midnight_ms()?,
        };
        let to = match cli.to {
            Some(to) => to,
            None => today_midnight_ms()?,
        };

        if from >= to {
            return Err(CliError::config(format!(
                "from time ({}) must be before to time ({})",
                from, to
            )));
        }

        if cli.workers == 0 {
            return Err(CliError::config("worker count (-w) must be at least 1"));
        }

        Ok(Self {
            endpoint,
            api_key,
            from,
            to,
            workers: cli.workers,
            depth: cli.depth,
            limit: DEFAULT_PAGE_LIMIT,
            sort: cli.sort,
        })
    }

    /// Engine parameters for these settings
    pub fn plan(&self) -> RunPlan {
        RunPlan::new(self.from, self.to)
            .with_limit(self.limit)
            .with_workers(self.workers)
            .with_depth(self.depth)
    }
}

fn first_non_empty(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
