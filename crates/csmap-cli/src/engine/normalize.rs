//! Aggregation key construction
//!
//! A key pairs the access location with the entity path cut down to
//! `depth + 1` segments: `nfs1` + `/vol1/projects/x/y.txt` at depth 1 gives
//! `nfs1\t/vol1/projects`.

use crate::api::Activity;

/// Separator between location and path in a key. Never appears in either.
pub const KEY_DELIMITER: char = '\t';

/// Keep the first `depth + 1` segments of a `/`-delimited path.
///
/// A leading `/` marks an absolute path and is not counted as a segment.
/// Paths with fewer segments are returned whole.
pub fn truncate_path(path: &str, depth: usize) -> String {
    let (root, relative) = match path.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", path),
    };

    let kept: Vec<&str> = relative.split('/').take(depth.saturating_add(1)).collect();
    format!("{}{}", root, kept.join("/"))
}

/// Aggregation key for one record
pub fn normalize(record: &Activity, depth: usize) -> String {
    format!(
        "{}{}{}",
        record.access_location,
        KEY_DELIMITER,
        truncate_path(&record.entity_path, depth)
    )
}
