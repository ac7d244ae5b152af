//! Waldiez notebook server
//!
//! HTTP endpoints the Waldiez frontend talks to: resolving and exporting
//! `.waldiez` flows, uploading attachments and serving the monaco editor
//! bundle that is provisioned from the npm registry at startup.

pub mod assets;
pub mod config;
pub mod export;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
