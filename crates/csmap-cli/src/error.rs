//! Error types for cs-client-map
//!
//! Every error is user-facing. The variant decides the process exit status so
//! scripts can tell bad configuration from bad credentials from a failed run.

use csmap_common::CsMapError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Exit status for configuration errors (missing endpoint/key, bad flags).
pub const EXIT_CONFIG: i32 = 1;

/// Exit status when the API rejects the credentials.
pub const EXIT_UNAUTHORIZED: i32 = 2;

/// Exit status when a page could not be fetched or decoded.
pub const EXIT_RUN_FAILED: i32 = 3;

#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed
    #[error("Failed to parse config file '{path}': {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Config file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The API answered 401
    #[error("Authentication failed (offset {offset}), please check API KEY and API Endpoint")]
    Unauthorized { offset: u64 },

    /// The API answered with a non-success status other than 401
    #[error("Page at offset {offset} failed: server returned HTTP {status}")]
    PageStatus { offset: u64, status: u16 },

    /// Connection or timeout failures outlasted the retry budget
    #[error("Page at offset {offset} failed after {attempts} attempt(s): {source}")]
    Transport {
        offset: u64,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    /// Response body was not a valid activities page
    #[error("Page at offset {offset} could not be decoded: {source}")]
    Decode {
        offset: u64,
        #[source]
        source: serde_json::Error,
    },

    /// A worker task stopped without reporting a result
    #[error("Worker stopped unexpectedly: {0}")]
    Worker(String),

    /// The run was cancelled because another worker failed
    #[error("Run cancelled")]
    Cancelled,

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Writing the report failed
    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] CsMapError),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a worker error
    pub fn worker(reason: impl Into<String>) -> Self {
        Self::Worker(reason.into())
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_)
            | CliError::ConfigFile { .. }
            | CliError::ConfigRead { .. }
            | CliError::Common(_) => EXIT_CONFIG,
            CliError::Unauthorized { .. } => EXIT_UNAUTHORIZED,
            _ => EXIT_RUN_FAILED,
        }
    }

    /// Whether this error is only a consequence of another failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CliError::Cancelled)
    }
}
