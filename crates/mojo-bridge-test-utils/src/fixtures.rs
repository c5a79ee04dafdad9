//! On-disk SDK layouts for resolver and debug-config tests.
//!
//! Every layout lives in a temporary directory that is removed when the
//! [`BuiltSdkLayout`] is dropped:
//!
//! ```text
//! <tmp>/env/                      Python environment prefix
//!   bin/{mojo,mojo-lsp-server,mblack,mojo-lldb-dap,mojo-lldb}
//!   lib/libMojoLLDB.{so,dylib}
//!   lib/lldb-visualizers/
//!   lib/mojo/bin/mojo
//!   share/max/modular.cfg         only with `with_environment_home`
//! <tmp>/workspace/.derived/       only with `with_workspace_sdk`
//!   modular.cfg, bin/, lib/
//! ```

use mojo_bridge_sdk::ToolPaths;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The `[mojo-max]` keys, in the order they are written.
pub const DESCRIPTOR_KEYS: [&str; 7] = [
    "lsp_server_path",
    "mblack_path",
    "lldb_plugin_path",
    "lldb_vscode_path",
    "driver_path",
    "lldb_visualizers_path",
    "lldb_path",
];

/// Builder for a temporary SDK layout.
pub struct SdkLayout {
    temp_dir: TempDir,
    environment: Option<EnvironmentStyle>,
    workspace_sdk: bool,
    workspace_dir: bool,
    version: Option<String>,
    omitted_key: Option<String>,
    raw_config: Option<Vec<u8>>,
    visualizers: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum EnvironmentStyle {
    Home,
    Packaged,
}

impl SdkLayout {
    /// Create a new, empty layout builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            environment: None,
            workspace_sdk: false,
            workspace_dir: false,
            version: Some("24.6.0".to_string()),
            omitted_key: None,
            raw_config: None,
            visualizers: Vec::new(),
        }
    }

    /// Install tools in the environment and describe them with `share/max/modular.cfg`.
    pub fn with_environment_home(mut self) -> Self {
        self.environment = Some(EnvironmentStyle::Home);
        self
    }

    /// Install tools in the environment using only the packaged layout.
    pub fn with_packaged_environment(mut self) -> Self {
        self.environment = Some(EnvironmentStyle::Packaged);
        self
    }

    /// Add a monorepo build under `workspace/.derived`.
    pub fn with_workspace_sdk(mut self) -> Self {
        self.workspace_sdk = true;
        self.workspace_dir = true;
        self
    }

    /// Create the `workspace` directory without an SDK in it.
    pub fn with_workspace(mut self) -> Self {
        self.workspace_dir = true;
        self
    }

    /// Set the `version` key written to every `modular.cfg` (`None` omits it).
    pub fn with_version(mut self, version: Option<&str>) -> Self {
        self.version = version.map(str::to_string);
        self
    }

    /// Leave `key` out of the `[mojo-max]` section of every `modular.cfg`.
    pub fn without_key(mut self, key: &str) -> Self {
        self.omitted_key = Some(key.to_string());
        self
    }

    /// Write these raw bytes as the environment `modular.cfg` instead.
    pub fn with_raw_config(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw_config = Some(bytes.into());
        self
    }

    /// Add visualizer scripts, created in the given order.
    pub fn with_visualizers(mut self, names: &[&str]) -> Self {
        self.visualizers = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Build the layout, creating all files and directories.
    pub fn build(self) -> BuiltSdkLayout {
        let root = self.temp_dir.path().to_path_buf();
        let prefix = root.join("env");
        let workspace = root.join("workspace");

        if let Some(style) = self.environment {
            let tools = install_tools(&prefix, &self.visualizers);
            if style == EnvironmentStyle::Home {
                let cfg_path = prefix.join("share/max/modular.cfg");
                let contents = match &self.raw_config {
                    Some(raw) => raw.clone(),
                    None => descriptor_text(
                        &tools,
                        self.version.as_deref(),
                        self.omitted_key.as_deref(),
                    )
                    .into_bytes(),
                };
                write(&cfg_path, &contents);
            }
        }

        if self.workspace_dir {
            create_dir(&workspace);
        }

        if self.workspace_sdk {
            let home = workspace.join(".derived");
            let tools = install_tools(&home, &self.visualizers);
            let contents = descriptor_text(
                &tools,
                self.version.as_deref(),
                self.omitted_key.as_deref(),
            );
            write(&home.join("modular.cfg"), contents.as_bytes());
        }

        BuiltSdkLayout {
            temp_dir: self.temp_dir,
        }
    }
}

impl Default for SdkLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// A built layout with files created on disk.
pub struct BuiltSdkLayout {
    temp_dir: TempDir,
}

impl BuiltSdkLayout {
    /// Root of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The environment prefix (`sys.prefix`).
    pub fn prefix(&self) -> PathBuf {
        self.root().join("env")
    }

    /// The environment's home-path install directory.
    pub fn environment_home(&self) -> PathBuf {
        self.prefix().join("share/max")
    }

    /// The workspace root.
    pub fn workspace(&self) -> PathBuf {
        self.root().join("workspace")
    }

    /// The monorepo SDK home inside the workspace.
    pub fn workspace_home(&self) -> PathBuf {
        self.workspace().join(".derived")
    }

    /// Tool paths installed under the environment prefix.
    pub fn environment_tools(&self) -> ToolPaths {
        tool_paths(&self.prefix())
    }

    /// Tool paths installed under the workspace SDK home.
    pub fn workspace_tools(&self) -> ToolPaths {
        tool_paths(&self.workspace_home())
    }

    /// Delete a path relative to the layout root.
    pub fn remove(&self, relative: impl AsRef<Path>) {
        let path = self.root().join(relative);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        result.unwrap_or_else(|e| panic!("Failed to remove {}: {}", path.display(), e));
    }
}

/// Shared library suffix for the debug plugin on this platform.
pub fn lib_ext() -> &'static str {
    if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

/// Conventional tool locations under `root`.
pub fn tool_paths(root: &Path) -> ToolPaths {
    ToolPaths {
        language_server: root.join("bin/mojo-lsp-server"),
        formatter: root.join("bin/mblack"),
        debug_plugin: root.join(format!("lib/libMojoLLDB.{}", lib_ext())),
        debug_adapter: root.join("bin/mojo-lldb-dap"),
        runtime: root.join("bin/mojo"),
        visualizers_dir: root.join("lib/lldb-visualizers"),
        debugger: root.join("bin/mojo-lldb"),
    }
}

/// Render a `modular.cfg` for `tools`.
pub fn descriptor_text(tools: &ToolPaths, version: Option<&str>, omit: Option<&str>) -> String {
    let values = [
        &tools.language_server,
        &tools.formatter,
        &tools.debug_plugin,
        &tools.debug_adapter,
        &tools.runtime,
        &tools.visualizers_dir,
        &tools.debugger,
    ];

    let mut text = String::new();
    if let Some(version) = version {
        text.push_str(&format!("version = {version}\n\n"));
    }
    text.push_str("[mojo-max]\n");
    for (key, value) in DESCRIPTOR_KEYS.iter().zip(values) {
        if Some(*key) == omit {
            continue;
        }
        text.push_str(&format!("{key} = {}\n", value.display()));
    }
    text
}

fn install_tools(root: &Path, visualizers: &[String]) -> ToolPaths {
    let tools = tool_paths(root);
    for file in [
        &tools.language_server,
        &tools.formatter,
        &tools.debug_plugin,
        &tools.debug_adapter,
        &tools.runtime,
        &tools.debugger,
    ] {
        write(file, b"");
    }
    write(&root.join("lib/mojo/bin/mojo"), b"");

    create_dir(&tools.visualizers_dir);
    for name in visualizers {
        write(&tools.visualizers_dir.join(name), b"# visualizer\n");
    }
    tools
}

fn create_dir(path: &Path) {
    fs::create_dir_all(path)
        .unwrap_or_else(|e| panic!("Failed to create directory {}: {}", path.display(), e));
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        create_dir(parent);
    }
    fs::write(path, contents)
        .unwrap_or_else(|e| panic!("Failed to write file {}: {}", path.display(), e));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_layout_writes_descriptor() {
        let layout = SdkLayout::new().with_environment_home().build();
        let cfg = fs::read_to_string(layout.environment_home().join("modular.cfg")).unwrap();
        assert!(cfg.starts_with("version = 24.6.0"));
        assert!(cfg.contains("[mojo-max]"));
        assert!(layout.environment_tools().runtime.exists());
    }

    #[test]
    fn test_packaged_layout_has_no_descriptor() {
        let layout = SdkLayout::new().with_packaged_environment().build();
        assert!(!layout.environment_home().join("modular.cfg").exists());
        assert!(layout.prefix().join("lib/mojo/bin/mojo").exists());
    }

    #[test]
    fn test_descriptor_text_omits_key() {
        let tools = tool_paths(Path::new("/sdk"));
        let text = descriptor_text(&tools, None, Some("driver_path"));
        assert!(!text.contains("driver_path"));
        assert!(!text.contains("version"));
        assert!(text.contains("lldb_path = /sdk/bin/mojo-lldb"));
    }
}
