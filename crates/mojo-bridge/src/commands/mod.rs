//! Subcommand implementations.

pub mod debug;
pub mod logging;
pub mod lsp;
pub mod sdk;

use crate::host::terminal_host;
use crate::settings::Settings;
use anyhow::Context as _;
use mojo_bridge_sdk::{SdkDescriptor, SdkResolver};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// State shared by the subcommands of one invocation.
pub struct Context {
    pub cwd: PathBuf,
    pub settings: Settings,
    pub resolver: SdkResolver,
}

impl Context {
    pub fn new(cwd: PathBuf, environment_prefix: Option<PathBuf>, settings: Settings) -> Self {
        let resolver = SdkResolver::new(terminal_host(cwd.clone(), environment_prefix));
        Self {
            cwd,
            settings,
            resolver,
        }
    }

    /// Resolve the SDK or fail. The resolver has already told the user why.
    pub async fn require_sdk(&self) -> anyhow::Result<Arc<SdkDescriptor>> {
        self.resolver
            .resolve()
            .await
            .context("no usable Mojo SDK found")
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}
