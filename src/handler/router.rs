//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: method validation, body size
//! limits, body collection, route matching and access logging.

use crate::config::AppState;
use crate::handler::{files, static_files, upload};
use crate::http::{self, HttpError, HttpResponse};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, SERVER};
use hyper::{Method, Request, StatusCode};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Decoded query string; repeated keys keep the last value
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let pairs = url::form_urlencoded::parse(query.unwrap_or_default().as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self(pairs)
    }

    /// Value of `name`, `None` when absent or empty
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = http_version_label(req.version()).to_string();
    entry.referer = header_string(&req, "referer");
    entry.user_agent = header_string(&req, "user-agent");

    logger::log_headers_count(req.headers().len(), state.config.logging.show_headers);

    let mut response = match admit(req, &state).await {
        Ok(req) => route_request(&req, &state).await,
        Err(resp) => resp,
    };
    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = usize::try_from(response.body().size_hint().exact().unwrap_or(0))
            .unwrap_or(usize::MAX);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(response)
}

/// Check method and size, then buffer the body
async fn admit<B>(req: Request<B>, state: &AppState) -> Result<Request<Bytes>, HttpResponse>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    if let Some(resp) = check_http_method(req.method(), state.config.http.enable_cors) {
        return Err(resp);
    }

    let max_body_size = state.config.http.max_body_size;
    if let Some(resp) = check_body_size(&req, max_body_size) {
        return Err(resp);
    }

    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(Request::from_parts(parts, collected.to_bytes())),
        Err(e) => {
            if e.is::<http_body_util::LengthLimitError>() {
                tracing::error!("Request body exceeded {max_body_size} bytes");
                Err(http::build_413_response())
            } else {
                tracing::warn!("Failed to read request body: {e}");
                Err(HttpError::bad_request("Could not read request body").into_response())
            }
        }
    }
}

/// Check HTTP method and return appropriate response for unsupported methods
fn check_http_method(method: &Method, enable_cors: bool) -> Option<HttpResponse> {
    match *method {
        Method::GET | Method::HEAD | Method::POST => None,
        Method::OPTIONS => Some(http::build_options_response(enable_cors)),
        _ => {
            tracing::warn!("Method not allowed: {method}");
            Some(http::build_405_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<HttpResponse> {
    let size_str = req.headers().get("content-length")?.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            tracing::error!("Request body too large: {size} bytes (max: {max_body_size})");
            Some(http::build_413_response())
        }
        Ok(_) => None,
        Err(_) => {
            tracing::warn!("Invalid Content-Length value: '{size_str}', skipping size check");
            None
        }
    }
}

/// Route request based on path and method
pub async fn route_request(req: &Request<Bytes>, state: &AppState) -> HttpResponse {
    let path = req.uri().path();
    let method = req.method();
    let is_read = matches!(*method, Method::GET | Method::HEAD);

    if path == "/healthz" || path == "/readyz" {
        return http::build_health_response("ok");
    }

    let result = if path == state.route("waldiez/files") {
        match *method {
            Method::POST => files::post(req, state).await,
            _ => files::get(req, state).await,
        }
    } else if path == state.route("waldiez/upload") {
        if *method == Method::POST {
            upload::post(req, state).await
        } else {
            Ok(http::build_405_response())
        }
    } else if let Some(rest) = path.strip_prefix(&state.route("static/")) {
        if is_read {
            Ok(static_files::serve_directory(req, &state.static_dir, rest).await)
        } else {
            Ok(http::build_405_response())
        }
    } else if let Some(rest) = path
        .strip_prefix(&state.route("min-maps/"))
        .or_else(|| path.strip_prefix("/min-maps/"))
    {
        if is_read {
            let maps = state.static_dir.join("min-maps");
            Ok(static_files::serve_directory(req, &maps, rest).await)
        } else {
            Ok(http::build_405_response())
        }
    } else {
        Err(HttpError::new(StatusCode::NOT_FOUND, "Not Found"))
    };

    result.unwrap_or_else(|err| {
        if err.status.is_server_error() {
            tracing::error!("{} {path}: {err}", req.method());
        } else {
            tracing::debug!("{} {path}: {err}", req.method());
        }
        err.into_response()
    })
}

fn header_string<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn http_version_label(version: hyper::Version) -> &'static str {
    if version == hyper::Version::HTTP_10 {
        "1.0"
    } else if version == hyper::Version::HTTP_2 {
        "2"
    } else {
        "1.1"
    }
}
