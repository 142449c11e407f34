//! Concurrent pagination and aggregation engine
//!
//! - [`fetcher`]: page source abstraction
//! - [`normalize`]: record to aggregation key
//! - [`store`]: concurrent unique-key set
//! - [`progress`]: per-worker completion accounting
//! - [`planner`]: probe, page planning and the worker pool

pub mod fetcher;
pub mod normalize;
pub mod planner;
pub mod progress;
pub mod store;

pub use fetcher::PageFetcher;
pub use normalize::{normalize, truncate_path, KEY_DELIMITER};
pub use planner::{jobs_count, Planner, RunPlan, Summary};
pub use progress::ProgressTracker;
pub use store::DedupStore;
