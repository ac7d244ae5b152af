//! HTTP protocol layer module
//!
//! Response builders, error mapping, MIME detection and conditional-request
//! helpers shared by every handler.

pub mod cache;
pub mod error;
pub mod mime;
pub mod response;

pub use error::HttpError;
pub use response::{
    build_304_response, build_404_response, build_405_response, build_413_response,
    build_health_response, build_options_response, json_response, HttpResponse,
};
