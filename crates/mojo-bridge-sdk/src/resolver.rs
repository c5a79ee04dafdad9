//! SDK discovery, validation and caching.
//!
//! Sources are tried in strict priority order:
//! 1. A monorepo build under `<workspace>/.derived` (only with exactly one
//!    workspace root open). Missing or unreadable directories fall through.
//! 2. The active Python environment: a `share/max/modular.cfg` descriptor if
//!    present, otherwise the packaged-distribution layout. Failure here is
//!    terminal; there is no further source.
//!
//! The result lives in a single cache slot until the environment key changes.

use crate::descriptor::{DescriptorDraft, SdkDescriptor, SdkFlavor, SdkKind, ToolPaths};
use crate::error::{DescriptorError, SdkError, SdkResult};
use crate::host::{EnvironmentProvider, EnvironmentRecord, Notifier, ProcessRunner, Workspace};
use crate::store::{ConfigStore, EntryKind, FileSystem, DESCRIPTOR_FILE};
use futures::future::{BoxFuture, FutureExt, Shared};
use ini::Properties;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Hidden directory holding a monorepo build of the SDK.
pub const WORKSPACE_SDK_DIR: &str = ".derived";

/// Section of `modular.cfg` holding the tool paths.
pub const DESCRIPTOR_SECTION: &str = "mojo-max";

/// Version reported when the descriptor does not carry one.
pub const DEFAULT_VERSION: &str = "0.0.0";

const CHANGE_CAPACITY: usize = 16;

/// Broadcast when the environment changed and the cached SDK was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SdkChanged {
    pub environment_key: String,
}

/// Collaborators supplied by the editor host.
#[derive(Clone)]
pub struct ResolverHost {
    pub fs: Arc<dyn FileSystem>,
    pub workspace: Arc<dyn Workspace>,
    pub environments: Arc<dyn EnvironmentProvider>,
    pub runner: Arc<dyn ProcessRunner>,
    pub notifier: Arc<dyn Notifier>,
}

type PendingResolve = Shared<BoxFuture<'static, Option<Arc<SdkDescriptor>>>>;

#[derive(Default)]
struct CacheSlot {
    cached: Option<Arc<SdkDescriptor>>,
    last_environment_key: Option<String>,
    error_shown: bool,
    /// Bumped on every invalidation; results from older epochs are dropped.
    epoch: u64,
    in_flight: Option<(u64, PendingResolve)>,
}

/// Resolves and caches the Mojo SDK.
///
/// Cheap to clone; every clone shares the same cache slot. The host builds one
/// per process and hands clones to the language client and debug providers.
#[derive(Clone)]
pub struct SdkResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    host: ResolverHost,
    store: ConfigStore,
    slot: Mutex<CacheSlot>,
    changes: broadcast::Sender<SdkChanged>,
}

impl SdkResolver {
    pub fn new(host: ResolverHost) -> Self {
        let store = ConfigStore::new(Arc::clone(&host.fs));
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            inner: Arc::new(ResolverInner {
                host,
                store,
                slot: Mutex::new(CacheSlot::default()),
                changes,
            }),
        }
    }

    pub fn host(&self) -> &ResolverHost {
        &self.inner.host
    }

    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    /// Resolve the SDK, returning the cached descriptor when there is one.
    ///
    /// Concurrent callers share a single in-flight lookup. Failures have
    /// already been reported to the user (at most once per epoch) and logged.
    pub async fn resolve(&self) -> Option<Arc<SdkDescriptor>> {
        let (epoch, pending) = {
            let mut slot = self.inner.slot.lock().await;
            if let Some(sdk) = &slot.cached {
                return Some(Arc::clone(sdk));
            }
            let current = slot.epoch;
            let joined = slot
                .in_flight
                .as_ref()
                .filter(|(epoch, _)| *epoch == current)
                .map(|(_, pending)| pending.clone());
            match joined {
                Some(pending) => (current, pending),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let pending = async move { inner.probe(current).await }.boxed().shared();
                    slot.in_flight = Some((current, pending.clone()));
                    (current, pending)
                }
            }
        };

        let result = pending.await;

        let mut slot = self.inner.slot.lock().await;
        if slot.epoch == epoch {
            if slot.in_flight.as_ref().is_some_and(|(e, _)| *e == epoch) {
                slot.in_flight = None;
            }
            if slot.cached.is_none() {
                slot.cached = result.clone();
            }
        } else {
            debug!(epoch, current = slot.epoch, "Discarding SDK resolved before invalidation");
        }
        result
    }

    /// The cached descriptor, without probing.
    pub async fn cached(&self) -> Option<Arc<SdkDescriptor>> {
        self.inner.slot.lock().await.cached.clone()
    }

    /// Drop the cached SDK when `key` differs from the last observed
    /// environment key. Returns whether an invalidation happened.
    pub async fn invalidate_on_environment_change(&self, key: &str) -> bool {
        let mut slot = self.inner.slot.lock().await;
        if slot.last_environment_key.as_deref() == Some(key) {
            return false;
        }

        info!(
            previous = ?slot.last_environment_key,
            current = %key,
            "Python environment changed, dropping cached SDK"
        );
        slot.last_environment_key = Some(key.to_string());
        slot.cached = None;
        slot.error_shown = false;
        slot.in_flight = None;
        slot.epoch += 1;
        drop(slot);

        // No subscribers is fine.
        let _ = self.inner.changes.send(SdkChanged {
            environment_key: key.to_string(),
        });
        true
    }

    /// Subscribe to environment-change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SdkChanged> {
        self.inner.changes.subscribe()
    }
}

impl ResolverInner {
    async fn probe(&self, epoch: u64) -> Option<Arc<SdkDescriptor>> {
        if let Some(sdk) = self.try_workspace_source(epoch).await {
            return Some(Arc::new(sdk));
        }

        match self.try_environment_source(epoch).await {
            Ok(sdk) => {
                info!(kind = ?sdk.kind(), version = %sdk.version(), "Resolved Mojo SDK");
                Some(Arc::new(sdk))
            }
            Err(e) => {
                self.report(epoch, &e).await;
                None
            }
        }
    }

    /// Workspace-local monorepo build. Never terminal.
    async fn try_workspace_source(&self, epoch: u64) -> Option<SdkDescriptor> {
        let roots = self.host.workspace.roots();
        let [root] = roots.as_slice() else {
            debug!(roots = roots.len(), "Skipping workspace SDK lookup");
            return None;
        };

        let home = root.join(WORKSPACE_SDK_DIR);
        match self.store.stat(&home).await {
            Ok(EntryKind::Directory) => {}
            Ok(EntryKind::File) => {
                debug!(path = %home.display(), "Workspace SDK path is not a directory");
                return None;
            }
            Err(e) => {
                debug!(path = %home.display(), error = %e, "No workspace SDK");
                return None;
            }
        }

        match load_home_sdk(&self.store, SdkKind::Internal, &home, None).await {
            Ok(sdk) => {
                info!(home = %home.display(), version = %sdk.version(), "Using workspace SDK");
                Some(sdk)
            }
            Err(e) => {
                self.report(epoch, &e).await;
                None
            }
        }
    }

    async fn try_environment_source(&self, epoch: u64) -> SdkResult<SdkDescriptor> {
        let environments = &self.host.environments;
        let Some(env_path) = environments.active_environment_path().await else {
            return Err(SdkError::EnvironmentUnavailable);
        };
        let Some(record) = environments.resolve_environment(&env_path).await else {
            warn!(environment = %env_path, "Active environment could not be resolved");
            return Err(SdkError::EnvironmentUnavailable);
        };

        {
            let mut slot = self.slot.lock().await;
            if slot.epoch == epoch && slot.last_environment_key.is_none() {
                slot.last_environment_key = Some(record.id.clone());
            }
        }

        let home = record.sys_prefix.join("share").join("max");
        if self.store.exists(&home.join(DESCRIPTOR_FILE)).await {
            debug!(home = %home.display(), "Environment carries a modular.cfg");
            load_home_sdk(
                &self.store,
                SdkKind::Environment,
                &home,
                Some(record.sys_prefix.clone()),
            )
            .await
        } else {
            debug!(prefix = %record.sys_prefix.display(), "Falling back to packaged layout");
            self.load_packaged_sdk(&record).await
        }
    }

    async fn load_packaged_sdk(&self, record: &EnvironmentRecord) -> SdkResult<SdkDescriptor> {
        let mut draft = packaged_draft(&record.sys_prefix, std::env::consts::OS);
        // Checked before the version query so a missing runtime is reported as
        // an incomplete install rather than a spawn failure.
        let missing = draft.missing_paths(&self.store).await;
        if !missing.is_empty() {
            return Err(SdkError::InstallationIncomplete {
                root: record.sys_prefix.clone(),
                missing,
            });
        }
        draft.version = self.probe_version(&draft.paths.runtime).await;
        SdkDescriptor::verify(draft, &self.store).await
    }

    async fn probe_version(&self, runtime: &Path) -> String {
        let args = vec!["--version".to_string()];
        match self.host.runner.run(runtime, &args, &BTreeMap::new()).await {
            Ok(output) if output.success => parse_version(&output.stdout).unwrap_or_else(|| {
                let raw = output.stdout.trim();
                warn!(output = %raw, "Unrecognised `mojo --version` output");
                if raw.is_empty() {
                    DEFAULT_VERSION.to_string()
                } else {
                    raw.to_string()
                }
            }),
            Ok(output) => {
                warn!(code = output.exit_code, stderr = %output.stderr.trim(), "`mojo --version` failed");
                DEFAULT_VERSION.to_string()
            }
            Err(e) => {
                warn!(runtime = %runtime.display(), error = %e, "Could not run `mojo --version`");
                DEFAULT_VERSION.to_string()
            }
        }
    }

    async fn report(&self, epoch: u64, err: &SdkError) {
        error!(error = %err, source = ?std::error::Error::source(err), "SDK resolution failed");
        if err.is_user_visible() {
            self.display_error(epoch, &err.user_message()).await;
        }
    }

    async fn display_error(&self, epoch: u64, message: &str) {
        {
            let mut slot = self.slot.lock().await;
            if slot.epoch != epoch {
                debug!(text = message, "Dropping message from a previous environment");
                return;
            }
            if slot.error_shown {
                debug!(text = message, "Suppressing repeated SDK error");
                return;
            }
            slot.error_shown = true;
        }
        self.host.notifier.show_error(message).await;
    }
}

/// Build a descriptor from the `modular.cfg` under `home`.
///
/// Any failure to read, decode or parse the file, or a missing key, fails the
/// whole construction.
pub async fn load_home_sdk(
    store: &ConfigStore,
    kind: SdkKind,
    home: &Path,
    prefix: Option<PathBuf>,
) -> SdkResult<SdkDescriptor> {
    let corrupted = |reason: DescriptorError| SdkError::InstallationCorrupted {
        home: home.to_path_buf(),
        reason,
    };

    let cfg_path = home.join(DESCRIPTOR_FILE);
    let ini = store.load_descriptor(&cfg_path).await.map_err(corrupted)?;

    let version = ini
        .general_section()
        .get("version")
        .unwrap_or(DEFAULT_VERSION)
        .to_string();

    let paths =
        tool_paths(ini.section(Some(DESCRIPTOR_SECTION)), &cfg_path).map_err(corrupted)?;

    let draft = DescriptorDraft {
        kind,
        version,
        paths,
        flavor: SdkFlavor::Home {
            home: home.to_path_buf(),
            prefix,
        },
        unwrapped_runtime: None,
    };
    SdkDescriptor::verify(draft, store).await
}

fn tool_paths(section: Option<&Properties>, cfg_path: &Path) -> Result<ToolPaths, DescriptorError> {
    let key = |name: &str| {
        section
            .and_then(|s| s.get(name))
            .map(PathBuf::from)
            .ok_or_else(|| DescriptorError::MissingKey {
                path: cfg_path.to_path_buf(),
                section: DESCRIPTOR_SECTION.to_string(),
                key: name.to_string(),
            })
    };

    Ok(ToolPaths {
        language_server: key("lsp_server_path")?,
        formatter: key("mblack_path")?,
        debug_plugin: key("lldb_plugin_path")?,
        debug_adapter: key("lldb_vscode_path")?,
        runtime: key("driver_path")?,
        visualizers_dir: key("lldb_visualizers_path")?,
        debugger: key("lldb_path")?,
    })
}

/// Conventional layout of a packaged distribution under `prefix`.
pub fn packaged_draft(prefix: &Path, os: &str) -> DescriptorDraft {
    let lib_ext = if os == "macos" { "dylib" } else { "so" };
    let bin = prefix.join("bin");
    let lib = prefix.join("lib");

    DescriptorDraft {
        kind: SdkKind::Environment,
        version: DEFAULT_VERSION.to_string(),
        paths: ToolPaths {
            language_server: bin.join("mojo-lsp-server"),
            formatter: bin.join("mblack"),
            debug_plugin: lib.join(format!("libMojoLLDB.{lib_ext}")),
            debug_adapter: bin.join("mojo-lldb-dap"),
            runtime: bin.join("mojo"),
            visualizers_dir: lib.join("lldb-visualizers"),
            debugger: bin.join("mojo-lldb"),
        },
        flavor: SdkFlavor::Packaged,
        unwrapped_runtime: Some(lib.join("mojo").join("bin").join("mojo")),
    }
}

static VERSION_REGEX: OnceLock<regex::Regex> = OnceLock::new();

/// Extract a dotted version from `mojo --version` output, e.g.
/// `mojo 24.6.0 (4487cd6e)` -> `24.6.0`.
pub fn parse_version(output: &str) -> Option<String> {
    let re = VERSION_REGEX.get_or_init(|| {
        regex::Regex::new(r"\b(\d+(?:\.\d+)+(?:[.\-][0-9A-Za-z]+)*)\b")
            .expect("Invalid regex pattern - this is a compile-time constant")
    });
    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
