// Cache record for the downloaded editor assets
// Stored as monaco_details.json next to the assets it describes

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::registry::PackageDetails;
use super::AssetError;

pub const DETAILS_JSON: &str = "monaco_details.json";

/// On-disk record; every field is optional so partial files still parse
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub last_check: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha_sum: Option<String>,
}

impl CacheRecord {
    /// Read the record; a missing or unreadable file is treated as no record
    pub fn read(static_root: &Path) -> Option<Self> {
        let path = static_root.join(DETAILS_JSON);
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Ignoring unreadable {}: {e}", path.display());
                None
            }
        }
    }

    pub fn write(
        static_root: &Path,
        details: &PackageDetails,
        now: DateTime<Utc>,
    ) -> Result<(), AssetError> {
        let record = Self {
            last_check: Some(now.to_rfc3339()),
            version: Some(details.version.clone()),
            url: Some(details.url.clone()),
            sha_sum: Some(details.sha_sum.clone()),
        };
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        record.serialize(&mut serializer)?;
        fs::write(static_root.join(DETAILS_JSON), out)?;
        Ok(())
    }

    /// Details from a complete record checked less than `window` ago
    pub fn fresh_details(&self, now: DateTime<Utc>, window: Duration) -> Option<PackageDetails> {
        let last_check = DateTime::parse_from_rfc3339(self.last_check.as_deref()?).ok()?;
        let details = PackageDetails {
            version: non_empty(self.version.as_deref())?,
            url: non_empty(self.url.as_deref())?,
            sha_sum: non_empty(self.sha_sum.as_deref())?,
        };
        (now.signed_duration_since(last_check.with_timezone(&Utc)) < window).then_some(details)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> PackageDetails {
        PackageDetails {
            version: "0.52.2".to_string(),
            url: "https://example.com/monaco.tgz".to_string(),
            sha_sum: "abc".to_string(),
        }
    }

    #[test]
    fn test_write_then_read_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        CacheRecord::write(dir.path(), &details(), now).unwrap();

        let raw = fs::read_to_string(dir.path().join(DETAILS_JSON)).unwrap();
        assert!(raw.contains("\n    \"version\": \"0.52.2\""));

        let record = CacheRecord::read(dir.path()).unwrap();
        assert_eq!(
            record.fresh_details(now + Duration::hours(23), Duration::hours(24)),
            Some(details())
        );
    }

    #[test]
    fn test_expired_record() {
        let now = Utc::now();
        let record = CacheRecord {
            last_check: Some((now - Duration::hours(25)).to_rfc3339()),
            version: Some("0.52.2".to_string()),
            url: Some("u".to_string()),
            sha_sum: Some("s".to_string()),
        };
        assert_eq!(record.fresh_details(now, Duration::hours(24)), None);
    }

    #[test]
    fn test_incomplete_or_naive_records_are_unusable() {
        let now = Utc::now();
        let missing_time = CacheRecord {
            version: Some("0.0.1".to_string()),
            url: Some("https://example.com".to_string()),
            sha_sum: Some("1234567890".to_string()),
            ..CacheRecord::default()
        };
        assert_eq!(missing_time.fresh_details(now, Duration::hours(24)), None);

        let naive = CacheRecord {
            last_check: Some("2025-01-01T00:00:00".to_string()),
            ..missing_time.clone()
        };
        assert_eq!(naive.fresh_details(now, Duration::hours(24)), None);

        let empty_sum = CacheRecord {
            last_check: Some(now.to_rfc3339()),
            sha_sum: Some(String::new()),
            ..missing_time
        };
        assert_eq!(empty_sum.fresh_details(now, Duration::hours(24)), None);
    }

    #[test]
    fn test_garbage_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DETAILS_JSON), "not json").unwrap();
        assert!(CacheRecord::read(dir.path()).is_none());
        assert!(CacheRecord::read(&dir.path().join("missing")).is_none());
    }
}
