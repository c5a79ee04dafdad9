//! Formatting Mojo sources with the SDK's `mblack`.

use crate::error::{LspError, LspResult};
use mojo_bridge_sdk::SdkDescriptor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Line length used when none is configured.
pub const DEFAULT_LINE_LENGTH: u32 = 80;

/// The `mblack` formatter of a resolved SDK.
#[derive(Debug, Clone)]
pub struct Formatter {
    command: PathBuf,
    environment: BTreeMap<String, String>,
    line_length: u32,
}

impl Formatter {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            environment: BTreeMap::new(),
            line_length: DEFAULT_LINE_LENGTH,
        }
    }

    /// The SDK's formatter, run with the SDK environment.
    pub fn from_sdk(sdk: &SdkDescriptor, telemetry: bool) -> Self {
        Self {
            environment: sdk.process_environment(telemetry),
            ..Self::new(sdk.formatter_path())
        }
    }

    pub fn with_line_length(mut self, line_length: u32) -> Self {
        self.line_length = line_length;
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Arguments reading the source from stdin and writing it to stdout.
    pub fn args(&self) -> Vec<String> {
        vec![
            "--fast".to_string(),
            "--preview".to_string(),
            "--quiet".to_string(),
            "-t".to_string(),
            "mojo".to_string(),
            "-l".to_string(),
            self.line_length.to_string(),
            "-".to_string(),
        ]
    }

    /// Format `source` and return the formatted text.
    pub async fn format_source(&self, source: &str) -> LspResult<String> {
        debug!(formatter = %self.command.display(), bytes = source.len(), "Running formatter");

        let mut child = Command::new(&self.command)
            .args(self.args())
            .envs(&self.environment)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LspError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        // Stdin is written while stdout is drained.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.as_bytes().to_vec();
            tokio::spawn(async move {
                stdin.write_all(&input).await?;
                stdin.shutdown().await?;
                Ok::<_, std::io::Error>(())
            })
        });

        let output = child.wait_with_output().await?;
        let written = match writer {
            Some(task) => task
                .await
                .map_err(|e| LspError::format_failed(format!("formatter input task failed: {e}")))?,
            None => Ok(()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LspError::format_failed(format!(
                "{} failed with exit code {:?}: {}",
                self.command.display(),
                output.status.code(),
                stderr.trim()
            )));
        }

        written?;

        String::from_utf8(output.stdout)
            .map_err(|e| LspError::format_failed(format!("formatter output is not UTF-8: {e}")))
    }

    /// Format a file in place. Returns whether its content changed.
    pub async fn format_file(&self, path: &Path) -> LspResult<bool> {
        let source = tokio::fs::read_to_string(path).await?;
        let formatted = self.format_source(&source).await?;
        if formatted == source {
            debug!(file = %path.display(), "Already formatted");
            return Ok(false);
        }
        tokio::fs::write(path, formatted).await?;
        debug!(file = %path.display(), "Format successful");
        Ok(true)
    }
}
