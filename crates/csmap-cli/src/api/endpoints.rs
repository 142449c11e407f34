//! API endpoint URL builders

use crate::api::types::PageRequest;

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-CloudInsights-ApiKey";

/// Path of the activities collection
pub const ACTIVITIES_PATH: &str = "/rest/v1/cloudsecure/activities";

/// Base URL for an instance endpoint.
///
/// Bare host names (`psxxx.cs01.cloudinsights.netapp.com`) get an `https://`
/// scheme; endpoints that already carry a scheme are kept as given.
pub fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');

    if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Build the activities page URL
pub fn activities_url(base_url: &str, request: &PageRequest) -> String {
    format!(
        "{}{}?from={}&to={}&offset={}&limit={}",
        base_url, ACTIVITIES_PATH, request.from, request.to, request.offset, request.limit
    )
}
