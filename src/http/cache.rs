//! HTTP cache validator module
//!
//! Weak `ETag`s for static assets, derived from size and modification time so
//! the file does not have to be hashed on every request.

use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Build a weak `ETag` such as `W/"1a2b-65f0c3e1"` from file metadata
pub fn etag_for(metadata: &Metadata) -> String {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    format!("W/\"{:x}-{modified:x}\"", metadata.len())
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Handles a single tag, a comma separated list and the `*` wildcard.
/// Comparison is weak, so `W/` prefixes are ignored on both sides.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let ours = etag.trim_start_matches("W/");
    if_none_match.is_some_and(|client| {
        client.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.trim_start_matches("W/") == ours
        })
    })
}
