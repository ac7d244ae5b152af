//! Editor asset provisioning
//!
//! The frontend loads the monaco editor from `<static>/vs`. On startup we make
//! sure a copy of the configured version is present: a cache record younger
//! than the freshness window is trusted as is, otherwise the registry is asked
//! for the version to use. A download happens when the loader is missing or
//! the selected version differs from the recorded one, and the tarball must
//! match the registry's SHA-1 sum. Every failure is fatal to startup.

mod archive;
mod details;
mod registry;

pub use details::{CacheRecord, DETAILS_JSON};
pub use registry::{select_details, NpmRegistry, PackageDetails, PackageRegistry};

use chrono::{Duration, Utc};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::AssetsConfig;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected registry metadata: {0}")]
    Metadata(String),
    #[error("SHA-1 sum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("archive does not contain {0}")]
    MissingContents(String),
    #[error("{} not found after provisioning", .0.display())]
    LoaderMissing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Ensure `static_root/vs/loader.js` exists for the configured version
///
/// Returns the details the cache record now holds.
pub async fn ensure_static_assets(
    static_root: &Path,
    settings: &AssetsConfig,
    registry: &dyn PackageRegistry,
) -> Result<PackageDetails, AssetError> {
    tokio::fs::create_dir_all(static_root).await?;

    let previous = CacheRecord::read(static_root);
    let details = package_details(previous.as_ref(), settings, registry)
        .await
        .inspect_err(|e| tracing::error!("Failed to get the monaco version to use: {e}"))?;

    let loader_js = static_root.join("vs").join("loader.js");
    let recorded_version = previous.and_then(|r| r.version);
    let version_changed = recorded_version
        .as_deref()
        .is_some_and(|v| v != details.version);

    if !loader_js.exists() || version_changed {
        tracing::info!("Downloading monaco editor {} ...", details.version);
        download(&details, static_root, registry)
            .await
            .inspect_err(|e| tracing::error!("Failed to download monaco editor files: {e}"))?;
    }
    if !loader_js.exists() {
        tracing::error!("Monaco editor files not found in {}", static_root.display());
        return Err(AssetError::LoaderMissing(loader_js));
    }

    CacheRecord::write(static_root, &details, Utc::now())?;
    tracing::info!("Monaco editor files are up-to-date ({})", details.version);
    Ok(details)
}

async fn package_details(
    cached: Option<&CacheRecord>,
    settings: &AssetsConfig,
    registry: &dyn PackageRegistry,
) -> Result<PackageDetails, AssetError> {
    let hours = i64::try_from(settings.freshness_hours).unwrap_or(i64::MAX);
    let window = Duration::try_hours(hours).unwrap_or(Duration::MAX);
    let pinned = settings.pinned();

    if let Some(details) = cached.and_then(|r| r.fresh_details(Utc::now(), window)) {
        if pinned.map_or(true, |pin| pin == details.version) {
            tracing::debug!("Using cached monaco details ({})", details.version);
            return Ok(details);
        }
    }

    let metadata = registry.fetch_metadata(&settings.package).await?;
    select_details(&metadata, pinned)
}

async fn download(
    details: &PackageDetails,
    static_root: &Path,
    registry: &dyn PackageRegistry,
) -> Result<(), AssetError> {
    let data = registry.download(&details.url).await?;
    archive::verify_sha1(&data, &details.sha_sum)?;

    let root = static_root.to_path_buf();
    tokio::task::spawn_blocking(move || archive::install(&data, &root))
        .await
        .map_err(|e| AssetError::Io(std::io::Error::other(e)))?
}
