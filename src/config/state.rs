// Application state module
// Holds the loaded configuration plus everything resolved from it at startup

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::types::Config;
use crate::export::FlowExporter;

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    /// Absolute server root
    pub root_dir: PathBuf,
    /// Absolute directory the editor assets live in
    pub static_dir: PathBuf,
    /// Working directory captured at startup, used to shorten export results
    pub cwd: PathBuf,
    /// Normalised prefix, always starts and ends with `/`
    pub base_url: String,
    pub exporter: Arc<dyn FlowExporter>,
}

impl AppState {
    pub fn new(config: &Config, exporter: Arc<dyn FlowExporter>) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let root_dir = std::path::absolute(Path::new(&config.server.root_dir))?;
        let static_dir = std::path::absolute(Path::new(&config.assets.static_dir))?;

        Ok(Self {
            config: config.clone(),
            root_dir,
            static_dir,
            cwd,
            base_url: normalize_base_url(&config.server.base_url),
            exporter,
        })
    }

    /// Full path of an endpoint mounted under the base url
    pub fn route(&self, suffix: &str) -> String {
        format!("{}{}", self.base_url, suffix.trim_start_matches('/'))
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}
