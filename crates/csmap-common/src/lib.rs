//! cs-client-map Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities and error handling for the cs-client-map workspace.
//!
//! # Overview
//!
//! - **Error Handling**: Common error and result types
//! - **Logging**: Centralized `tracing` subscriber setup
//! - **Time**: Query window defaults and timestamp formatting
//!
//! # Example
//!
//! ```no_run
//! use csmap_common::time::{today_midnight_ms, yesterday_midnight_ms};
//!
//! fn default_window() -> csmap_common::Result<(i64, i64)> {
//!     Ok((yesterday_midnight_ms()?, today_midnight_ms()?))
//! }
//! ```

pub mod error;
pub mod logging;
pub mod time;

// Re-export commonly used types
pub use error::{CsMapError, Result};
