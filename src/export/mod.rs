//! Flow export module
//!
//! Converting a `.waldiez` flow into Python or a notebook is done by an
//! external exporter. [`FlowExporter`] is the seam to it; [`export_flows`]
//! runs a batch where individual failures only drop that file.

mod command;

pub use command::CommandExporter;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix every exportable flow file carries
pub const FLOW_SUFFIX: &str = ".waldiez";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to start exporter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("exporter exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("exporter finished but {} was not written", .0.display())]
    MissingOutput(PathBuf),
}

/// Output format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTarget {
    Py,
    Ipynb,
}

impl ExportTarget {
    /// Parse the `extension` field of an export request
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "py" => Some(Self::Py),
            "ipynb" => Some(Self::Ipynb),
            _ => None,
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Py => "py",
            Self::Ipynb => "ipynb",
        }
    }
}

#[async_trait]
pub trait FlowExporter: Send + Sync {
    /// Write the export of `source` to `output`, replacing it when `force` is set
    async fn export(&self, source: &Path, output: &Path, force: bool) -> Result<(), ExportError>;
}

/// Export each flow next to its source and return the outputs relative to `cwd`
pub async fn export_flows(
    exporter: &dyn FlowExporter,
    files: &[PathBuf],
    target: ExportTarget,
    cwd: &Path,
) -> Vec<String> {
    let mut exported = Vec::with_capacity(files.len());
    for file in files {
        let source = match tokio::fs::canonicalize(file).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Skipping {}: {e}", file.display());
                continue;
            }
        };
        let output = source.with_extension(target.extension());
        if let Err(e) = exporter.export(&source, &output, true).await {
            tracing::debug!(
                "Error exporting {} to .{}: {e}",
                source.display(),
                target.extension()
            );
            continue;
        }
        exported.push(relative_to_cwd(&output, cwd));
    }
    exported
}

/// Strip the working directory prefix; paths outside it are returned whole
pub fn relative_to_cwd(path: &Path, cwd: &Path) -> String {
    path.strip_prefix(cwd)
        .unwrap_or(path)
        .display()
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::testing::FakeExporter;
    use super::*;

    #[test]
    fn test_parse_target() {
        assert_eq!(ExportTarget::parse("py"), Some(ExportTarget::Py));
        assert_eq!(ExportTarget::parse("ipynb"), Some(ExportTarget::Ipynb));
        assert_eq!(ExportTarget::parse("invalid"), None);
        assert_eq!(ExportTarget::parse("PY"), None);
    }

    #[test]
    fn test_relative_to_cwd() {
        let cwd = Path::new("/work/project");
        assert_eq!(
            relative_to_cwd(Path::new("/work/project/flows/flow.py"), cwd),
            Path::new("flows").join("flow.py").display().to_string()
        );
        assert_eq!(
            relative_to_cwd(Path::new("/elsewhere/flow.py"), cwd),
            "/elsewhere/flow.py"
        );
    }

    #[tokio::test]
    async fn test_export_flows_partial_success() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().canonicalize().unwrap();
        let good = cwd.join("good.waldiez");
        let bad = cwd.join("bad.waldiez");
        std::fs::write(&good, "{}").unwrap();
        std::fs::write(&bad, "{}").unwrap();

        let exporter = FakeExporter {
            fail_on: vec!["bad.waldiez".to_string()],
            ..FakeExporter::default()
        };
        let exported = export_flows(
            &exporter,
            &[good.clone(), bad, cwd.join("gone.waldiez")],
            ExportTarget::Ipynb,
            &cwd,
        )
        .await;

        assert_eq!(exported, vec!["good.ipynb".to_string()]);
        assert!(cwd.join("good.ipynb").exists());
        assert!(!cwd.join("bad.ipynb").exists());
        // the missing file never reaches the exporter
        assert_eq!(exporter.calls.lock().unwrap().len(), 2);
    }
}
