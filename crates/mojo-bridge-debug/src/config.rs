//! Launch configuration for the `mojo-lldb` debug backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Type tag of the primary (LLDB-based) backend.
pub const DEBUG_TYPE: &str = "mojo-lldb";

/// Placeholder the host replaces with the active editor document.
pub const ACTIVE_FILE_PLACEHOLDER: &str = "${file}";

/// Source-file extensions accepted for file launches, without the dot.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["mojo", "🔥"];

/// Default LLDB frame format.
pub const DEFAULT_FRAME_FORMAT: &str = "frame #${frame.index}: ${frame.pc}{ ${module.file.basename}{`${function.name-with-args}}}{ at ${line.file.basename}:${line.number}}\n";

/// Default prefix that escapes raw debugger commands in the debug console.
pub const DEFAULT_COMMAND_ESCAPE_PREFIX: &str = ":";

/// Default initialisation timeout, in seconds.
pub const DEFAULT_INIT_TIMEOUT_SECS: u64 = 5 * 60;

/// Variable read by the adapter transport for its initialisation timeout.
pub const INIT_TIMEOUT_ENV: &str = "LLDB_VSCODE_RIT_TIMEOUT_IN_MS";

/// Debug request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Launch,
    Attach,
}

/// A launch configuration for `mojo-lldb`, as written in `launch.json`.
///
/// Every field is optional on input. Keys this crate does not know are kept
/// in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugLaunchConfig {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub debug_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Process to attach to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Mojo source file to run under the debugger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mojo_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Extra arguments to `mojo run`, placed before the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_args: Option<Vec<String>>,

    /// `NAME=value` entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_entry: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_commands: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_frame_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_synthetic_child_debugging: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_auto_variable_summaries: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_escape_prefix: Option<String>,

    /// Initialisation timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Debugger executable used by the adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debugger_path: Option<String>,

    /// Debug adapter executable for the launcher to spawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_adapter_path: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DebugLaunchConfig {
    /// Whether this request attaches to a running process.
    pub fn is_attach(&self) -> bool {
        self.pid.is_some() || self.request == Some(RequestKind::Attach)
    }

    /// Replace the active-document placeholder in every path and string-list
    /// field.
    pub fn substitute_active_file(&mut self, file: &str) {
        let substitute = |value: &mut String| {
            if value.contains(ACTIVE_FILE_PLACEHOLDER) {
                *value = value.replace(ACTIVE_FILE_PLACEHOLDER, file);
            }
        };

        for field in [&mut self.mojo_file, &mut self.program, &mut self.cwd] {
            if let Some(value) = field.as_mut() {
                substitute(value);
            }
        }
        for list in [
            &mut self.args,
            &mut self.env,
            &mut self.build_args,
            &mut self.init_commands,
        ] {
            if let Some(values) = list.as_mut() {
                values.iter_mut().for_each(&substitute);
            }
        }
    }
}

/// The configuration used when debugging starts without a `launch.json`:
/// run the active document.
pub fn default_configuration() -> DebugLaunchConfig {
    DebugLaunchConfig {
        debug_type: Some(DEBUG_TYPE.to_string()),
        request: Some(RequestKind::Launch),
        name: Some("Mojo: Debug current Mojo file".to_string()),
        mojo_file: Some(ACTIVE_FILE_PLACEHOLDER.to_string()),
        ..DebugLaunchConfig::default()
    }
}

/// Whether `file` has a Mojo source extension.
pub fn is_mojo_source(file: &str) -> bool {
    Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
