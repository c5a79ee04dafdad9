//! Host collaborators the resolver depends on.
//!
//! The editor shell owns workspaces, the Python environment picker, process
//! spawning and message dialogs. Each is reached through a narrow trait so the
//! resolution logic can run against fakes in tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// The workspace folders currently open in the editor.
pub trait Workspace: Send + Sync {
    fn roots(&self) -> Vec<PathBuf>;
}

/// A concrete Python environment, as resolved by the environment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
    /// Identifier of the environment (its path as reported by the picker).
    pub id: String,
    /// `sys.prefix` of the environment.
    pub sys_prefix: PathBuf,
}

/// Source of the active Python environment.
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    /// Path of the active environment, if one is selected.
    async fn active_environment_path(&self) -> Option<String>;

    /// Resolve an environment path to a concrete record.
    async fn resolve_environment(&self, path: &str) -> Option<EnvironmentRecord>;
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

impl ProcessOutput {
    /// Stdout and stderr joined, for commands that do not care which stream
    /// carries the answer.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Runs a program to completion and captures its output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> std::io::Result<ProcessOutput>;
}

/// Shows messages to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show_error(&self, message: &str);
}

/// Editor extensions installed alongside this one.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync {
    async fn is_installed(&self, extension_id: &str) -> bool;
}

/// Process runner backed by `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> std::io::Result<ProcessOutput> {
        debug!(program = %program.display(), ?args, "Running process");

        let output = Command::new(program)
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        })
    }
}
