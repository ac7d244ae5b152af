// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub assets: AssetsConfig,
    pub exporter: ExporterConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// URL prefix every extension endpoint is mounted under
    pub base_url: String,
    /// Directory relative request paths are resolved against
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    pub show_headers: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stderr if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    pub read_timeout: u64,
    pub write_timeout: u64,
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub server_name: String,
    pub enable_cors: bool,
    pub max_body_size: u64,
}

/// Editor asset provisioning
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AssetsConfig {
    /// Download and serve the editor assets locally
    pub enabled: bool,
    pub static_dir: String,
    pub registry_url: String,
    pub package: String,
    /// Empty string means "follow dist-tags.latest"
    #[serde(default)]
    pub pinned_version: String,
    pub freshness_hours: u64,
}

impl AssetsConfig {
    pub fn pinned(&self) -> Option<&str> {
        let pinned = self.pinned_version.trim();
        if pinned.is_empty() {
            None
        } else {
            Some(pinned)
        }
    }
}

/// External flow exporter invocation
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExporterConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}
