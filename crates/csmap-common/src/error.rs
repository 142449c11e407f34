//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CsMapError>;

/// Main error type for shared utilities
#[derive(Error, Debug)]
pub enum CsMapError {
    #[error("Invalid timestamp: {0}")]
    InvalidTime(String),
}
