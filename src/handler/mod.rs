//! Request handler module
//!
//! Routing dispatch plus one module per endpoint family: flow files and
//! export, attachment uploads and the editor's static assets.

pub mod files;
pub mod router;
pub mod static_files;
pub mod upload;

// Re-export main entry point
pub use router::handle_request;
