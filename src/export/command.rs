// Exporter backed by the waldiez command line tool
// Runs `<command> <args..> --file <source> --output <output> [--force]`

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::{ExportError, FlowExporter};
use crate::config::ExporterConfig;

pub struct CommandExporter {
    command: String,
    args: Vec<String>,
}

impl CommandExporter {
    pub fn new(config: &ExporterConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn build(&self, source: &Path, output: &Path, force: bool) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg("--file")
            .arg(source)
            .arg("--output")
            .arg(output);
        if force && !self.args.iter().any(|a| a == "--force") {
            cmd.arg("--force");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl FlowExporter for CommandExporter {
    async fn export(&self, source: &Path, output: &Path, force: bool) -> Result<(), ExportError> {
        tracing::debug!(
            "Running {} for {} -> {}",
            self.command,
            source.display(),
            output.display()
        );
        let result = self
            .build(source, output, force)
            .output()
            .await
            .map_err(|source| ExportError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(ExportError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !output.is_file() {
            return Err(ExportError::MissingOutput(output.to_path_buf()));
        }
        Ok(())
    }
}
