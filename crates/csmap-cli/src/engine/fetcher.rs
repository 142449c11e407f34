//! Page source abstraction used by the planner

use crate::api::{ActivityPage, PageRequest};
use crate::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Something that can fetch one page of activities.
///
/// Implementations must return promptly with [`CliError::Cancelled`] once
/// `cancel` fires.
///
/// [`CliError::Cancelled`]: crate::error::CliError::Cancelled
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &PageRequest, cancel: &CancellationToken)
        -> Result<ActivityPage>;
}
