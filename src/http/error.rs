//! Handler error type
//!
//! A handler failure is a status code plus a short reason. The reason is sent
//! both as the HTTP reason phrase and inside a JSON body so browser clients
//! that cannot read the status line still see it.

use hyper::ext::ReasonPhrase;
use hyper::StatusCode;
use serde_json::json;
use thiserror::Error;

use super::response::{json_response, HttpResponse};

#[derive(Debug, Error)]
#[error("{status}: {reason}")]
pub struct HttpError {
    pub status: StatusCode,
    pub reason: String,
}

impl HttpError {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }

    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, reason)
    }

    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, reason)
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, reason)
    }

    pub fn into_response(self) -> HttpResponse {
        let body = json!({
            "message": self.reason,
            "reason": self.reason,
        });
        let mut response = json_response(self.status, &body);
        // Reason phrases cannot carry CR/LF; fall back to the canonical one
        if let Ok(phrase) = ReasonPhrase::try_from(self.reason.into_bytes()) {
            response.extensions_mut().insert(phrase);
        }
        response
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error while handling request: {err}");
        Self::internal("Internal server error")
    }
}
