//! Translation of `mojo-lldb` configurations into the `cppdbg` schema.
//!
//! The GDB-based backend takes its arguments as one shell-quoted string and
//! its environment as name/value records, and renames a few fields.

use crate::args::{join_quoted, run_invocation};
use crate::config::{is_mojo_source, DebugLaunchConfig, RequestKind};
use crate::error::{DebugError, DebugResult};
use mojo_bridge_sdk::{ExtensionRegistry, Notifier, SdkDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Type tag of the secondary (GDB-based) backend.
pub const SECONDARY_DEBUG_TYPE: &str = "cppdbg";

/// Extension providing the secondary backend.
pub const COMPANION_EXTENSION: &str = "ms-vscode.cpptools";

/// Machine-interface mode requested from the secondary backend.
pub const MI_MODE: &str = "gdb";

/// One environment variable of a [`SecondaryDebugConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentEntry {
    pub name: String,
    pub value: String,
}

impl EnvironmentEntry {
    /// Split `NAME=value` on the first `=`. An entry without `=` has an
    /// empty value.
    pub fn parse(entry: &str) -> Self {
        let (name, value) = entry.split_once('=').unwrap_or((entry, ""));
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A `cppdbg` launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryDebugConfig {
    #[serde(rename = "type")]
    pub debug_type: String,
    pub request: RequestKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// All program arguments in one shell-quoted string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_at_entry: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    #[serde(default)]
    pub environment: Vec<EnvironmentEntry>,
    #[serde(rename = "MIMode")]
    pub mi_mode: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Map a launch configuration onto the `cppdbg` schema.
///
/// A Mojo file is rewritten to `mojo run` the same way as for `mojo-lldb`,
/// except that build arguments are not inserted.
pub fn translate(config: DebugLaunchConfig, sdk: &SdkDescriptor) -> DebugResult<SecondaryDebugConfig> {
    let request = if config.is_attach() {
        RequestKind::Attach
    } else {
        config.request.unwrap_or(RequestKind::Launch)
    };

    let (program, args) = match config.mojo_file.as_deref() {
        Some(file) if request == RequestKind::Launch => {
            if !sdk.supports_file_launch() {
                return Err(DebugError::FileLaunchUnsupported {
                    file: file.to_string(),
                });
            }
            if !is_mojo_source(file) {
                return Err(DebugError::UnsupportedExtension {
                    file: file.to_string(),
                });
            }
            let args = run_invocation(file, &[], config.args.as_deref().unwrap_or_default());
            (Some(sdk.runtime_path().display().to_string()), Some(args))
        }
        _ => (config.program, config.args),
    };

    let args = args.map(|args| join_quoted(&args)).transpose()?;

    let environment = config
        .env
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .map(EnvironmentEntry::parse)
        .collect();

    Ok(SecondaryDebugConfig {
        debug_type: SECONDARY_DEBUG_TYPE.to_string(),
        request,
        name: config.name,
        program,
        args,
        cwd: config.cwd,
        stop_at_entry: config.stop_on_entry,
        process_id: config.pid,
        environment,
        mi_mode: MI_MODE.to_string(),
        extra: config.extra,
    })
}

/// Translates configurations for the `cppdbg` backend after checking that
/// its extension is installed.
pub struct DebugConfigTranslator {
    extensions: Arc<dyn ExtensionRegistry>,
    notifier: Arc<dyn Notifier>,
}

impl DebugConfigTranslator {
    pub fn new(extensions: Arc<dyn ExtensionRegistry>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            extensions,
            notifier,
        }
    }

    /// Fails with [`DebugError::CompanionToolMissing`] when the companion
    /// extension is absent.
    pub async fn check_companion(&self) -> DebugResult<()> {
        if self.extensions.is_installed(COMPANION_EXTENSION).await {
            Ok(())
        } else {
            Err(DebugError::CompanionToolMissing {
                extension: COMPANION_EXTENSION.to_string(),
                debug_type: SECONDARY_DEBUG_TYPE.to_string(),
            })
        }
    }

    /// Check for the companion extension, showing a message when it is
    /// missing.
    pub async fn ensure_companion(&self) -> bool {
        match self.check_companion().await {
            Ok(()) => true,
            Err(e) => {
                self.report(&e).await;
                false
            }
        }
    }

    /// Translate `config`, or show why it cannot be translated and return `None`.
    pub async fn translate(
        &self,
        config: DebugLaunchConfig,
        sdk: &SdkDescriptor,
    ) -> Option<SecondaryDebugConfig> {
        if !self.ensure_companion().await {
            return None;
        }
        self.convert(config, sdk).await
    }

    /// Translate `config` once the companion extension is known to be
    /// installed.
    pub async fn convert(
        &self,
        config: DebugLaunchConfig,
        sdk: &SdkDescriptor,
    ) -> Option<SecondaryDebugConfig> {
        match translate(config, sdk) {
            Ok(translated) => {
                debug!(request = ?translated.request, "Translated debug configuration to cppdbg");
                Some(translated)
            }
            Err(e) => {
                self.report(&e).await;
                None
            }
        }
    }

    async fn report(&self, e: &DebugError) {
        info!(error = %e, "Cannot translate debug configuration");
        self.notifier.show_error(&e.to_string()).await;
    }
}
