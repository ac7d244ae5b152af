//! `.waldiez` file endpoints
//!
//! GET resolves a path the frontend knows relative to the server root into
//! the real path on disk, or streams an image back with `view=`. POST exports
//! a batch of flows to `.py` or `.ipynb`.

use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

use super::router::QueryParams;
use crate::config::AppState;
use crate::export::{self, ExportTarget, FLOW_SUFFIX};
use crate::http::response::bytes_response;
use crate::http::{json_response, HttpError, HttpResponse};

/// `GET /waldiez/files?path=<p>` or `GET /waldiez/files?view=<p>`
pub async fn get(req: &Request<Bytes>, state: &AppState) -> Result<HttpResponse, HttpError> {
    let params = QueryParams::parse(req.uri().query());

    if let Some(view) = params.get("view") {
        let file = resolve_file(&state.root_dir, view).await?;
        let content = tokio::fs::read(&file).await?;
        return Ok(bytes_response(
            Bytes::from(content),
            "image/png",
            req.method() == Method::HEAD,
        ));
    }

    let Some(requested) = params.get("path") else {
        return Err(HttpError::bad_request("No path in request"));
    };
    let file = resolve_file(&state.root_dir, requested).await?;
    Ok(json_response(
        StatusCode::OK,
        &json!({ "path": file.display().to_string() }),
    ))
}

/// `POST /waldiez/files` with `{"files": [...], "extension": "py" | "ipynb"}`
pub async fn post(req: &Request<Bytes>, state: &AppState) -> Result<HttpResponse, HttpError> {
    let (files, target) = gather_post_data(req.body(), &state.root_dir).await?;
    let exported = export::export_flows(state.exporter.as_ref(), &files, target, &state.cwd).await;
    tracing::info!("Exported: {exported:?}");
    Ok(json_response(StatusCode::OK, &json!({ "files": exported })))
}

async fn gather_post_data(
    body: &Bytes,
    root: &Path,
) -> Result<(Vec<PathBuf>, ExportTarget), HttpError> {
    let input: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let Some(input) = input.as_object().filter(|o| !o.is_empty()) else {
        return Err(HttpError::bad_request("No data in request"));
    };

    let target = input
        .get("extension")
        .and_then(Value::as_str)
        .and_then(ExportTarget::parse)
        .ok_or_else(|| HttpError::bad_request("Invalid extension"))?;

    let requested = input
        .get("files")
        .and_then(Value::as_array)
        .filter(|files| !files.is_empty())
        .ok_or_else(|| HttpError::bad_request("No files in request"))?;

    let mut files = Vec::with_capacity(requested.len());
    for entry in requested {
        let Some(name) = entry.as_str().filter(|n| n.ends_with(FLOW_SUFFIX)) else {
            continue;
        };
        match resolve_file(root, name).await {
            Ok(path) => files.push(path),
            Err(e) => tracing::error!("Error getting file path: {}", e.reason),
        }
    }
    if files.is_empty() {
        return Err(HttpError::bad_request("No valid files in the request"));
    }
    Ok((files, target))
}

/// Find `requested` as given (absolute or relative to the working directory),
/// then relative to `root`
///
/// The returned path is absolute with `.` and `..` folded away lexically;
/// symlinks are kept.
pub async fn resolve_file(root: &Path, requested: &str) -> Result<PathBuf, HttpError> {
    let as_given = Path::new(requested);
    if is_file(as_given).await {
        return Ok(normalize_lexically(&std::path::absolute(as_given)?));
    }
    let joined = root.join(requested);
    if is_file(&joined).await {
        return Ok(normalize_lexically(&std::path::absolute(&joined)?));
    }
    Err(HttpError::not_found(format!("File not found: {requested}")))
}

/// Drop `.` segments and let `..` remove the previous one, without touching
/// the filesystem. `..` at the root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|m| m.is_file())
}
