//! Completes partial `mojo-lldb` launch configurations.

use crate::args::run_invocation;
use crate::config::{
    is_mojo_source, DebugLaunchConfig, RequestKind, DEBUG_TYPE, DEFAULT_COMMAND_ESCAPE_PREFIX,
    DEFAULT_FRAME_FORMAT, DEFAULT_INIT_TIMEOUT_SECS, INIT_TIMEOUT_ENV,
};
use crate::error::{DebugError, DebugResult};
use mojo_bridge_sdk::{ConfigStore, ProcessRunner, SdkDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Commands that must run before anything the user adds, in this order.
pub fn init_command_prefix(sdk: &SdkDescriptor) -> Vec<String> {
    vec![
        format!("plugin load {}", sdk.debug_plugin_path().display()),
        "settings set target.show-hex-variable-values-with-leading-zeroes false".to_string(),
        "settings set target.process.optimization-warnings false".to_string(),
        "mojo telemetry session-start".to_string(),
    ]
}

/// Knobs for [`DebugConfigNormalizer`].
#[derive(Debug, Clone)]
pub struct NormalizerOptions {
    /// Pass the telemetry opt-in through to the debug session.
    pub telemetry: bool,
    /// Timeout used when the configuration does not set one.
    pub init_timeout_secs: u64,
    /// Import visualizers in lexicographic order rather than listing order.
    pub sort_visualizers: bool,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            telemetry: true,
            init_timeout_secs: DEFAULT_INIT_TIMEOUT_SECS,
            sort_visualizers: true,
        }
    }
}

/// Fills a launch configuration in from a resolved SDK.
pub struct DebugConfigNormalizer {
    store: ConfigStore,
    runner: Arc<dyn ProcessRunner>,
    options: NormalizerOptions,
}

impl DebugConfigNormalizer {
    pub fn new(store: ConfigStore, runner: Arc<dyn ProcessRunner>, options: NormalizerOptions) -> Self {
        Self {
            store,
            runner,
            options,
        }
    }

    pub fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    /// Produce a complete configuration.
    ///
    /// Fields the caller set are kept. Fails without a partial result when a
    /// file launch is not possible.
    pub async fn normalize(
        &self,
        mut config: DebugLaunchConfig,
        sdk: &SdkDescriptor,
    ) -> DebugResult<DebugLaunchConfig> {
        if config.is_attach() {
            config.request = Some(RequestKind::Attach);
        } else {
            if let Some(file) = config.mojo_file.clone() {
                self.rewrite_file_launch(&mut config, &file, sdk)?;
            }
            config.request.get_or_insert(RequestKind::Launch);
        }
        config.debug_type.get_or_insert_with(|| DEBUG_TYPE.to_string());

        config
            .custom_frame_format
            .get_or_insert_with(|| DEFAULT_FRAME_FORMAT.to_string());
        config.enable_synthetic_child_debugging.get_or_insert(true);
        config.enable_auto_variable_summaries.get_or_insert(true);
        config
            .command_escape_prefix
            .get_or_insert_with(|| DEFAULT_COMMAND_ESCAPE_PREFIX.to_string());
        let timeout = *config.timeout.get_or_insert(self.options.init_timeout_secs);

        let mut init_commands = init_command_prefix(sdk);
        init_commands.extend(config.init_commands.take().unwrap_or_default());
        if sdk.supports_scripting(self.runner.as_ref()).await {
            init_commands.extend(self.visualizer_commands(sdk).await);
        } else {
            debug!("Debugger lacks scripting support, skipping visualizers");
        }
        config.init_commands = Some(init_commands);

        let mut env = vec![format!("{INIT_TIMEOUT_ENV}={}", timeout.saturating_mul(1000))];
        env.extend(
            sdk.process_environment(self.options.telemetry)
                .into_iter()
                .map(|(name, value)| format!("{name}={value}")),
        );
        env.extend(config.env.take().unwrap_or_default());
        config.env = Some(env);

        config
            .debugger_path
            .get_or_insert_with(|| sdk.debugger_path().display().to_string());
        config.debug_adapter_path = Some(sdk.debug_adapter_path().display().to_string());

        Ok(config)
    }

    fn rewrite_file_launch(
        &self,
        config: &mut DebugLaunchConfig,
        file: &str,
        sdk: &SdkDescriptor,
    ) -> DebugResult<()> {
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

        let build_args = config.build_args.as_deref().unwrap_or_default();
        let program_args = config.args.as_deref().unwrap_or_default();
        config.args = Some(run_invocation(file, build_args, program_args));
        config.program = Some(sdk.runtime_path().display().to_string());
        debug!(file, "Rewrote file launch to `mojo run`");
        Ok(())
    }

    /// One `command script import` per entry of the visualizers directory.
    async fn visualizer_commands(&self, sdk: &SdkDescriptor) -> Vec<String> {
        let dir = sdk.visualizers_dir_path();
        let mut entries: Vec<PathBuf> = match self.store.list_dir(dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot list LLDB visualizers");
                return Vec::new();
            }
        };
        if self.options.sort_visualizers {
            entries.sort();
        }
        entries
            .iter()
            .map(|entry| format!("command script import {}", entry.display()))
            .collect()
    }
}
