//! Attachment upload endpoint
//!
//! Accepts one `multipart/form-data` part named `file` and stores it in the
//! server root under a sanitised name.

use futures_util::stream;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Request, StatusCode};
use serde_json::json;
use std::convert::Infallible;

use crate::config::AppState;
use crate::http::{json_response, HttpError, HttpResponse};

/// Suffixes an uploaded file may carry (case sensitive)
pub const ALLOWED_EXTENSIONS: [&str; 14] = [
    ".txt", ".pdf", ".doc", ".docx", ".rtf", ".xlsx", ".xls", ".csv", ".json", ".yaml", ".yml",
    ".xml", ".md", ".odt",
];

const FILE_FIELD: &str = "file";

/// `POST /waldiez/upload`
pub async fn post(req: &Request<Bytes>, state: &AppState) -> Result<HttpResponse, HttpError> {
    let Some((filename, data)) = read_file_part(req).await else {
        return Err(HttpError::bad_request("No file in request"));
    };

    let filename = sanitize_filename::sanitize(&filename);
    if !is_allowed_extension(&filename) {
        return Err(HttpError::bad_request("File extension not allowed"));
    }

    let destination = std::path::absolute(state.root_dir.join(&filename))?;
    tokio::fs::write(&destination, &data).await?;
    tracing::info!("Saved upload to {}", destination.display());

    Ok(json_response(
        StatusCode::OK,
        &json!({ "path": destination.display().to_string() }),
    ))
}

pub fn is_allowed_extension(filename: &str) -> bool {
    ALLOWED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext))
}

/// Filename and contents of the first `file` part that names a file
async fn read_file_part(req: &Request<Bytes>) -> Option<(String, Bytes)> {
    let content_type = req.headers().get(CONTENT_TYPE)?.to_str().ok()?;
    let boundary = match multer::parse_boundary(content_type) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!("Not a multipart upload: {e}");
            return None;
        }
    };

    let body = req.body().clone();
    let chunks = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(chunks, boundary);

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!("Malformed multipart body: {e}");
                return None;
            }
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        return match field.bytes().await {
            Ok(data) => Some((filename, data)),
            Err(e) => {
                tracing::debug!("Failed to read upload part: {e}");
                None
            }
        };
    }
}
