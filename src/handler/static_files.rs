//! Static file serving module
//!
//! Serves the editor bundle installed under the static directory, with
//! traversal protection and `ETag` revalidation.

use crate::http::{self, cache, mime, HttpResponse};
use hyper::body::Bytes;
use hyper::header::IF_NONE_MATCH;
use hyper::{Method, Request};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Serve `relative` out of `dir`
pub async fn serve_directory(req: &Request<Bytes>, dir: &Path, relative: &str) -> HttpResponse {
    let Some(file_path) = resolve_within(dir, relative).await else {
        return http::build_404_response();
    };

    let metadata = match fs::metadata(&file_path).await {
        Ok(m) if m.is_file() => m,
        _ => return http::build_404_response(),
    };
    let etag = cache::etag_for(&metadata);
    let if_none_match = req
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok());
    if cache::check_etag_match(if_none_match, &etag) {
        return http::build_304_response(&etag);
    }

    let content = match fs::read(&file_path).await {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to read file '{}': {e}", file_path.display());
            return http::build_404_response();
        }
    };
    let content_type = mime::get_content_type(file_path.extension().and_then(|e| e.to_str()));

    http::response::build_cached_response(
        Bytes::from(content),
        content_type,
        &etag,
        req.method() == Method::HEAD,
    )
}

/// Join `relative` onto `dir`, refusing anything that escapes it
async fn resolve_within(dir: &Path, relative: &str) -> Option<PathBuf> {
    let relative = Path::new(relative.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        tracing::warn!("Path traversal attempt blocked: {}", relative.display());
        return None;
    }

    let base = match fs::canonicalize(dir).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!("Static directory '{}' is not accessible: {e}", dir.display());
            return None;
        }
    };
    // missing files are an ordinary 404
    let candidate = fs::canonicalize(dir.join(relative)).await.ok()?;
    if !candidate.starts_with(&base) {
        tracing::warn!(
            "Path traversal attempt blocked: {} -> {}",
            relative.display(),
            candidate.display()
        );
        return None;
    }
    Some(candidate)
}
