// Package registry access
// Metadata lookup and tarball download against an npm compatible registry

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::AssetError;

/// Version, tarball url and SHA-1 sum of one published package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetails {
    pub version: String,
    pub url: String,
    pub sha_sum: String,
}

#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Full package document (`GET <registry>/<package>`)
    async fn fetch_metadata(&self, package: &str) -> Result<Value, AssetError>;

    async fn download(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: &str) -> Result<Self, AssetError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("waldiez-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn fetch_metadata(&self, package: &str) -> Result<Value, AssetError> {
        let url = format!("{}/{package}", self.base_url);
        tracing::debug!("Fetching package metadata from {url}");
        let metadata = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(metadata)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        tracing::debug!("Downloading {url}");
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(body.to_vec())
    }
}

/// Pick the pinned version when the registry lists it, `dist-tags.latest` otherwise
pub fn select_details(metadata: &Value, pinned: Option<&str>) -> Result<PackageDetails, AssetError> {
    let versions = metadata
        .get("versions")
        .and_then(Value::as_object)
        .ok_or_else(|| AssetError::Metadata("missing `versions`".to_string()))?;

    let version = match pinned {
        Some(pin) if versions.contains_key(pin) => pin.to_string(),
        _ => metadata
            .pointer("/dist-tags/latest")
            .and_then(Value::as_str)
            .ok_or_else(|| AssetError::Metadata("missing `dist-tags.latest`".to_string()))?
            .to_string(),
    };

    let dist = versions
        .get(&version)
        .and_then(|v| v.get("dist"))
        .ok_or_else(|| AssetError::Metadata(format!("no dist for version {version}")))?;
    let field = |name: &str| {
        dist.get(name)
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| AssetError::Metadata(format!("missing dist.{name} for {version}")))
    };

    Ok(PackageDetails {
        url: field("tarball")?,
        sha_sum: field("shasum")?,
        version,
    })
}
