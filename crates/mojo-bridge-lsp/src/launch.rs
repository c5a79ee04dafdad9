//! How the Mojo language server is launched.

use mojo_bridge_sdk::SdkDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Language identifier reported to the editor.
pub const LANGUAGE_ID: &str = "mojo";

/// File extensions handled by the language server, without the dot.
pub const EXTENSIONS: [&str; 2] = ["mojo", "🔥"];

/// Files marking the root of a Mojo project.
pub const ROOT_PATTERNS: [&str; 4] = ["mojoproject.toml", "pixi.toml", "pyproject.toml", ".git"];

/// Command line and environment for the language server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerLaunch {
    /// Language identifier.
    pub language: String,

    /// Server executable.
    pub command: PathBuf,

    /// Arguments for the command.
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables added to the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// File extensions handled by this server.
    pub extensions: Vec<String>,

    /// Root patterns to detect the project root.
    #[serde(default)]
    pub root_patterns: Vec<String>,
}

impl ServerLaunch {
    /// Launch the SDK's `mojo-lsp-server` with the SDK environment.
    pub fn from_sdk(sdk: &SdkDescriptor, telemetry: bool) -> Self {
        Self {
            language: LANGUAGE_ID.to_string(),
            command: sdk.language_server_path().to_path_buf(),
            args: Vec::new(),
            env: sdk.process_environment(telemetry),
            extensions: EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            root_patterns: ROOT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Append server arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Check if this server handles the given file extension.
    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// Whether `path` is a file this server handles.
    pub fn handles_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.handles_extension(ext))
    }

    /// Find the project root for a file using root patterns.
    pub fn find_workspace_root(&self, file_path: &Path) -> Option<PathBuf> {
        let mut current = file_path.parent()?;

        loop {
            for pattern in &self.root_patterns {
                if current.join(pattern).exists() {
                    return Some(current.to_path_buf());
                }
            }

            current = current.parent()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn launch() -> ServerLaunch {
        ServerLaunch {
            language: LANGUAGE_ID.to_string(),
            command: PathBuf::from("/env/bin/mojo-lsp-server"),
            args: Vec::new(),
            env: BTreeMap::new(),
            extensions: EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            root_patterns: ROOT_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_handles_mojo_files() {
        let launch = launch();
        assert!(launch.handles_file(Path::new("/w/main.mojo")));
        assert!(launch.handles_file(Path::new("/w/main.🔥")));
        assert!(launch.handles_extension("MOJO"));
        assert!(!launch.handles_file(Path::new("/w/main.py")));
        assert!(!launch.handles_file(Path::new("/w/Makefile")));
    }

    #[test]
    fn test_with_args() {
        let launch = launch().with_args(["--log=verbose"]);
        assert_eq!(launch.args, vec!["--log=verbose".to_string()]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(launch()).unwrap();
        assert_eq!(value["command"], "/env/bin/mojo-lsp-server");
        assert_eq!(value["rootPatterns"][0], "mojoproject.toml");
        assert_eq!(value["extensions"][1], "🔥");
    }

    #[test]
    fn test_find_workspace_root() {
        let dir = tempdir().unwrap();
        let project = dir.path().join("project");
        std::fs::create_dir_all(project.join("src/pkg")).unwrap();
        std::fs::write(project.join("pixi.toml"), "").unwrap();

        let root = launch().find_workspace_root(&project.join("src/pkg/main.mojo"));
        assert_eq!(root, Some(project));
    }
}
