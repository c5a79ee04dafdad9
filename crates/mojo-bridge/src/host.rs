//! Terminal implementations of the editor collaborators.

use async_trait::async_trait;
use mojo_bridge_sdk::{
    EnvironmentProvider, EnvironmentRecord, ExtensionRegistry, Notifier, ResolverHost,
    TokioFileSystem, TokioProcessRunner, Workspace,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Variables naming the active Python environment, in lookup order.
pub const ENVIRONMENT_VARIABLES: [&str; 2] = ["CONDA_PREFIX", "VIRTUAL_ENV"];

/// Pick the environment prefix: an explicit one first, then the first
/// non-empty variable from [`ENVIRONMENT_VARIABLES`].
pub fn detect_prefix(
    explicit: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    explicit.or_else(|| {
        ENVIRONMENT_VARIABLES
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

/// The environment selected on the command line or activated in the shell.
#[derive(Debug, Clone, Default)]
pub struct EnvVarEnvironmentProvider {
    prefix: Option<PathBuf>,
}

impl EnvVarEnvironmentProvider {
    pub fn new(prefix: Option<PathBuf>) -> Self {
        Self { prefix }
    }

    /// Use `explicit` when given, otherwise the process environment.
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        Self::new(detect_prefix(explicit, |name| std::env::var(name).ok()))
    }
}

#[async_trait]
impl EnvironmentProvider for EnvVarEnvironmentProvider {
    async fn active_environment_path(&self) -> Option<String> {
        self.prefix.as_ref().map(|p| p.display().to_string())
    }

    async fn resolve_environment(&self, path: &str) -> Option<EnvironmentRecord> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Some(EnvironmentRecord {
                id: path.to_string(),
                sys_prefix: PathBuf::from(path),
            }),
            Ok(_) => {
                warn!(path, "Environment prefix is not a directory");
                None
            }
            Err(e) => {
                warn!(path, error = %e, "Environment prefix not found");
                None
            }
        }
    }
}

/// A fixed set of workspace roots.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    roots: Vec<PathBuf>,
}

impl StaticWorkspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }
}

impl Workspace for StaticWorkspace {
    fn roots(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}

/// Prints user-facing errors on stderr, keeping stdout for JSON output.
#[derive(Debug, Default, Clone)]
pub struct StderrNotifier;

#[async_trait]
impl Notifier for StderrNotifier {
    async fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }
}

/// Extensions listed in the settings.
#[derive(Debug, Clone, Default)]
pub struct StaticExtensionRegistry {
    installed: Vec<String>,
}

impl StaticExtensionRegistry {
    pub fn new(installed: Vec<String>) -> Self {
        Self { installed }
    }
}

#[async_trait]
impl ExtensionRegistry for StaticExtensionRegistry {
    async fn is_installed(&self, extension_id: &str) -> bool {
        // Extension identifiers are case-insensitive.
        let found = self
            .installed
            .iter()
            .any(|id| id.eq_ignore_ascii_case(extension_id));
        debug!(extension = extension_id, found, "Checked extension");
        found
    }
}

/// Collaborators for a terminal session rooted at `cwd`.
pub fn terminal_host(cwd: PathBuf, environment_prefix: Option<PathBuf>) -> ResolverHost {
    ResolverHost {
        fs: Arc::new(TokioFileSystem),
        workspace: Arc::new(StaticWorkspace::new(vec![cwd])),
        environments: Arc::new(EnvVarEnvironmentProvider::from_env(environment_prefix)),
        runner: Arc::new(TokioProcessRunner),
        notifier: Arc::new(StderrNotifier),
    }
}
