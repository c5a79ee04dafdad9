//! The resolved, immutable description of a Mojo SDK installation.

use crate::error::{SdkError, SdkResult};
use crate::host::ProcessRunner;
use crate::store::ConfigStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Variable carrying the telemetry opt-in to spawned tools.
pub const TELEMETRY_ENV: &str = "MODULAR_TELEMETRY_ENABLED";

/// Variable pointing tools at a home-path installation.
pub const HOME_ENV: &str = "MODULAR_HOME";

/// Legacy alias of [`HOME_ENV`] still read by older toolchains.
pub const LEGACY_HOME_ENV: &str = "MOJO_HOME";

/// Where the SDK was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SdkKind {
    /// Installed into the active Python environment.
    Environment,
    /// Pointed to explicitly by the user.
    Custom,
    /// Built inside the open workspace (monorepo layout).
    Internal,
}

/// How the installation is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum SdkFlavor {
    /// Paths inferred by convention from a packaged distribution.
    Packaged,
    /// Paths read from a `modular.cfg` descriptor under `home`.
    Home {
        home: PathBuf,
        prefix: Option<PathBuf>,
    },
}

/// The seven tool paths every installation provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolPaths {
    pub language_server: PathBuf,
    pub formatter: PathBuf,
    pub debug_plugin: PathBuf,
    pub debug_adapter: PathBuf,
    pub runtime: PathBuf,
    pub visualizers_dir: PathBuf,
    pub debugger: PathBuf,
}

impl ToolPaths {
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        [
            &self.language_server,
            &self.formatter,
            &self.debug_plugin,
            &self.debug_adapter,
            &self.runtime,
            &self.visualizers_dir,
            &self.debugger,
        ]
        .into_iter()
        .map(PathBuf::as_path)
    }
}

/// Everything needed to build a descriptor, before any path is checked.
#[derive(Debug, Clone)]
pub struct DescriptorDraft {
    pub kind: SdkKind,
    pub version: String,
    pub paths: ToolPaths,
    pub flavor: SdkFlavor,
    pub unwrapped_runtime: Option<PathBuf>,
}

impl DescriptorDraft {
    /// Every path of the draft that does not exist, in field order.
    pub async fn missing_paths(&self, store: &ConfigStore) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for path in self.paths.iter().chain(self.unwrapped_runtime.as_deref()) {
            if !store.exists(path).await {
                missing.push(path.to_path_buf());
            }
        }
        missing
    }
}

/// A resolved Mojo SDK.
///
/// Every path was checked to exist when the descriptor was built; there is no
/// partially valid descriptor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkDescriptor {
    kind: SdkKind,
    version: String,
    paths: ToolPaths,
    flavor: SdkFlavor,
    #[serde(skip_serializing_if = "Option::is_none")]
    unwrapped_runtime: Option<PathBuf>,
    #[serde(skip)]
    scripting: OnceCell<bool>,
}

impl SdkDescriptor {
    /// Check every path of `draft` and build the descriptor.
    ///
    /// Fails with [`SdkError::InstallationIncomplete`] listing every missing
    /// path when any of them does not exist.
    pub async fn verify(draft: DescriptorDraft, store: &ConfigStore) -> SdkResult<Self> {
        let missing = draft.missing_paths(store).await;
        if !missing.is_empty() {
            let root = match &draft.flavor {
                SdkFlavor::Home { home, .. } => home.clone(),
                SdkFlavor::Packaged => common_root(&draft.paths.runtime),
            };
            return Err(SdkError::InstallationIncomplete { root, missing });
        }

        debug!(kind = ?draft.kind, version = %draft.version, "SDK descriptor verified");

        Ok(Self {
            kind: draft.kind,
            version: draft.version,
            paths: draft.paths,
            flavor: draft.flavor,
            unwrapped_runtime: draft.unwrapped_runtime,
            scripting: OnceCell::new(),
        })
    }

    pub fn kind(&self) -> SdkKind {
        self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn flavor(&self) -> &SdkFlavor {
        &self.flavor
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn language_server_path(&self) -> &Path {
        &self.paths.language_server
    }

    pub fn formatter_path(&self) -> &Path {
        &self.paths.formatter
    }

    pub fn debug_plugin_path(&self) -> &Path {
        &self.paths.debug_plugin
    }

    pub fn debug_adapter_path(&self) -> &Path {
        &self.paths.debug_adapter
    }

    pub fn runtime_path(&self) -> &Path {
        &self.paths.runtime
    }

    pub fn visualizers_dir_path(&self) -> &Path {
        &self.paths.visualizers_dir
    }

    pub fn debugger_path(&self) -> &Path {
        &self.paths.debugger
    }

    /// The runtime binary without its environment wrapper, packaged installs only.
    pub fn unwrapped_runtime_path(&self) -> Option<&Path> {
        self.unwrapped_runtime.as_deref()
    }

    /// Whether `mojo run <file>` can be launched directly under the debugger.
    ///
    /// Packaged installs lack the descriptor metadata needed to invoke the
    /// runtime without its wrapper.
    pub fn supports_file_launch(&self) -> bool {
        matches!(self.flavor, SdkFlavor::Home { .. })
    }

    /// Variables to inject into every process spawned from this SDK.
    pub fn process_environment(&self, include_telemetry: bool) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(TELEMETRY_ENV.to_string(), include_telemetry.to_string());

        if let SdkFlavor::Home { home, prefix } = &self.flavor {
            let home = home.display().to_string();
            let legacy = prefix
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| home.clone());
            env.insert(HOME_ENV.to_string(), home);
            env.insert(LEGACY_HOME_ENV.to_string(), legacy);
        }

        env
    }

    /// Whether the bundled debugger has its embedded Python scripting
    /// extension.
    ///
    /// Probed once per descriptor by evaluating `100+1` through the debugger's
    /// script interpreter; later calls return the memoised answer.
    pub async fn supports_scripting(&self, runner: &dyn ProcessRunner) -> bool {
        *self
            .scripting
            .get_or_init(|| async {
                let args = vec![
                    "-b".to_string(),
                    "-o".to_string(),
                    "script print(100+1)".to_string(),
                ];
                match runner
                    .run(self.debugger_path(), &args, &self.process_environment(false))
                    .await
                {
                    Ok(output) => {
                        let supported = output.combined().contains("101");
                        debug!(supported, "Probed debugger scripting support");
                        supported
                    }
                    Err(e) => {
                        warn!(debugger = %self.debugger_path().display(), error = %e, "Failed to probe debugger scripting support");
                        false
                    }
                }
            })
            .await
    }
}

/// Best guess at the environment prefix from a `<prefix>/bin/<tool>` path.
fn common_root(runtime: &Path) -> PathBuf {
    runtime
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| runtime.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TokioFileSystem;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn paths_under(root: &Path) -> ToolPaths {
        ToolPaths {
            language_server: root.join("bin/mojo-lsp-server"),
            formatter: root.join("bin/mblack"),
            debug_plugin: root.join("lib/libMojoLLDB.so"),
            debug_adapter: root.join("bin/mojo-lldb-dap"),
            runtime: root.join("bin/mojo"),
            visualizers_dir: root.join("lib/lldb-visualizers"),
            debugger: root.join("bin/mojo-lldb"),
        }
    }

    fn touch_all(paths: &ToolPaths) {
        for path in paths.iter() {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, "").unwrap();
        }
    }

    #[tokio::test]
    async fn test_verify_fails_atomically_on_missing_path() {
        let dir = tempdir().unwrap();
        let paths = paths_under(dir.path());
        touch_all(&paths);
        std::fs::remove_file(&paths.formatter).unwrap();

        let store = ConfigStore::new(Arc::new(TokioFileSystem));
        let draft = DescriptorDraft {
            kind: SdkKind::Environment,
            version: "0.0.0".to_string(),
            paths: paths.clone(),
            flavor: SdkFlavor::Packaged,
            unwrapped_runtime: None,
        };

        match SdkDescriptor::verify(draft, &store).await {
            Err(SdkError::InstallationIncomplete { root, missing }) => {
                assert_eq!(root, dir.path());
                assert_eq!(missing, vec![paths.formatter]);
            }
            other => panic!("expected incomplete installation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_home_environment_contributes_home_and_legacy() {
        let dir = tempdir().unwrap();
        let paths = paths_under(dir.path());
        touch_all(&paths);

        let store = ConfigStore::new(Arc::new(TokioFileSystem));
        let draft = DescriptorDraft {
            kind: SdkKind::Environment,
            version: "24.6.0".to_string(),
            paths,
            flavor: SdkFlavor::Home {
                home: PathBuf::from("/env/share/max"),
                prefix: Some(PathBuf::from("/env")),
            },
            unwrapped_runtime: None,
        };
        let sdk = SdkDescriptor::verify(draft, &store).await.unwrap();

        assert!(sdk.supports_file_launch());
        let env = sdk.process_environment(true);
        assert_eq!(env.get(TELEMETRY_ENV).map(String::as_str), Some("true"));
        assert_eq!(env.get(HOME_ENV).map(String::as_str), Some("/env/share/max"));
        assert_eq!(env.get(LEGACY_HOME_ENV).map(String::as_str), Some("/env"));
    }

    #[tokio::test]
    async fn test_packaged_environment_only_carries_telemetry() {
        let dir = tempdir().unwrap();
        let paths = paths_under(dir.path());
        touch_all(&paths);

        let store = ConfigStore::new(Arc::new(TokioFileSystem));
        let draft = DescriptorDraft {
            kind: SdkKind::Environment,
            version: "24.6.0".to_string(),
            paths,
            flavor: SdkFlavor::Packaged,
            unwrapped_runtime: None,
        };
        let sdk = SdkDescriptor::verify(draft, &store).await.unwrap();

        assert!(!sdk.supports_file_launch());
        let env = sdk.process_environment(false);
        assert_eq!(env.len(), 1);
        assert_eq!(env.get(TELEMETRY_ENV).map(String::as_str), Some("false"));
    }

    #[test]
    fn test_common_root() {
        assert_eq!(
            common_root(Path::new("/opt/env/bin/mojo")),
            PathBuf::from("/opt/env")
        );
    }
}
