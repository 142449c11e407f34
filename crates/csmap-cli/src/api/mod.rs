//! API client module
//!
//! HTTP client for the Cloud Secure activity endpoint.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{ApiClient, RetryPolicy};
pub use types::*;
