//! `debug-config`: resolve a launch configuration the way the editor's
//! debug-session launcher does.

use super::{print_json, Context};
use crate::host::StaticExtensionRegistry;
use crate::jsonc;
use crate::Backend;
use anyhow::{bail, Context as _};
use mojo_bridge_debug::config::{ACTIVE_FILE_PLACEHOLDER, DEBUG_TYPE};
use mojo_bridge_debug::{DebugConfigurationProvider, DebugLaunchConfig};
use mojo_bridge_util::path::absolutize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Parse a single configuration or pick one from a `launch.json`.
///
/// From a `launch.json` the configuration called `name` is used; without a
/// name, the first `mojo-lldb` configuration, else the first one.
pub fn parse_launch_config(content: &str, name: Option<&str>) -> anyhow::Result<DebugLaunchConfig> {
    let value: Value =
        serde_json::from_str(&jsonc::to_json(content)).context("launch configuration is not valid JSON")?;

    let selected = match value.get("configurations").and_then(Value::as_array) {
        Some(configurations) => {
            let found = match name {
                Some(name) => configurations
                    .iter()
                    .find(|c| c.get("name").and_then(Value::as_str) == Some(name))
                    .with_context(|| format!("no launch configuration named '{name}'"))?,
                None => configurations
                    .iter()
                    .find(|c| c.get("type").and_then(Value::as_str) == Some(DEBUG_TYPE))
                    .or_else(|| configurations.first())
                    .context("launch.json has no configurations")?,
            };
            found.clone()
        }
        None => value,
    };

    serde_json::from_value(selected).context("invalid launch configuration")
}

pub async fn debug_config(
    context: &Context,
    backend: Backend,
    config_path: Option<PathBuf>,
    name: Option<&str>,
    file: Option<String>,
) -> anyhow::Result<()> {
    let config = match config_path {
        Some(path) => {
            let path = absolutize(&path, &context.cwd);
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            parse_launch_config(&content, name)?
        }
        None => DebugLaunchConfig::default(),
    };

    let extensions = StaticExtensionRegistry::new(context.settings.installed_extensions());
    let provider = DebugConfigurationProvider::new(
        context.resolver.clone(),
        Arc::new(extensions),
        context.settings.normalizer_options(),
    );

    let mut config = provider.resolve_debug_configuration(config);
    match file {
        Some(file) => {
            let file = absolutize(Path::new(&file), &context.cwd);
            debug!(file = %file.display(), "Substituting active file");
            config.substitute_active_file(&file.display().to_string());
        }
        None if config
            .mojo_file
            .as_deref()
            .is_some_and(|f| f.contains(ACTIVE_FILE_PLACEHOLDER)) =>
        {
            bail!("the configuration debugs {ACTIVE_FILE_PLACEHOLDER}; pass --file");
        }
        None => {}
    }

    match backend {
        Backend::Lldb => {
            let resolved = provider
                .resolve_with_substituted_variables(config)
                .await
                .context("could not resolve the debug configuration")?;
            print_json(&resolved)
        }
        Backend::Gdb => {
            let translated = provider
                .resolve_secondary(config)
                .await
                .context("could not translate the debug configuration")?;
            print_json(&translated)
        }
    }
}
