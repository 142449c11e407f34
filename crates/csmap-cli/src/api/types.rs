//! Activity API request and response types

use serde::{Deserialize, Serialize};

/// One page worth of query parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Window start, Unix milliseconds
    pub from: i64,
    /// Window end, Unix milliseconds
    pub to: i64,
    pub offset: u64,
    pub limit: u32,
}

impl PageRequest {
    /// Request for the `index`-th page of `limit` records
    pub fn for_page(from: i64, to: i64, index: u64, limit: u32) -> Self {
        Self {
            from,
            to,
            offset: index * u64::from(limit),
            limit,
        }
    }
}

/// Body of `GET /rest/v1/cloudsecure/activities`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPage {
    /// Total records matching the query, not the size of this page
    pub count: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub results: Vec<Activity>,
}

/// A single activity record. Fields the aggregation does not use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(default)]
    pub access_location: String,
    #[serde(default)]
    pub entity_path: String,
}

impl Activity {
    pub fn new(access_location: impl Into<String>, entity_path: impl Into<String>) -> Self {
        Self {
            access_location: access_location.into(),
            entity_path: entity_path.into(),
        }
    }
}
