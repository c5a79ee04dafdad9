//! Entry point used by the debug-session launcher.

use crate::config::{default_configuration, DebugLaunchConfig};
use crate::normalizer::{DebugConfigNormalizer, NormalizerOptions};
use crate::translator::{DebugConfigTranslator, SecondaryDebugConfig};
use mojo_bridge_sdk::{ExtensionRegistry, SdkResolver};
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves debug configurations for both backends.
///
/// Resolution runs in two phases, mirroring how editors handle variable
/// substitution: [`resolve_debug_configuration`](Self::resolve_debug_configuration)
/// fills in an empty request before placeholders such as `${file}` are
/// substituted, and [`resolve_with_substituted_variables`](Self::resolve_with_substituted_variables)
/// completes the configuration afterwards. Failures are shown to the user
/// and reported as `None`.
pub struct DebugConfigurationProvider {
    resolver: SdkResolver,
    normalizer: DebugConfigNormalizer,
    translator: DebugConfigTranslator,
}

impl DebugConfigurationProvider {
    pub fn new(
        resolver: SdkResolver,
        extensions: Arc<dyn ExtensionRegistry>,
        options: NormalizerOptions,
    ) -> Self {
        let host = resolver.host();
        let normalizer =
            DebugConfigNormalizer::new(resolver.store().clone(), Arc::clone(&host.runner), options);
        let translator = DebugConfigTranslator::new(extensions, Arc::clone(&host.notifier));
        Self {
            resolver,
            normalizer,
            translator,
        }
    }

    /// First phase: a configuration without a request kind is replaced by
    /// [`default_configuration`]. Unknown keys are carried over.
    pub fn resolve_debug_configuration(&self, config: DebugLaunchConfig) -> DebugLaunchConfig {
        if config.request.is_none() {
            debug!("No launch configuration given, debugging the active file");
            let mut defaulted = default_configuration();
            defaulted.extra = config.extra;
            return defaulted;
        }
        config
    }

    /// Second phase: complete a `mojo-lldb` configuration.
    pub async fn resolve_with_substituted_variables(
        &self,
        config: DebugLaunchConfig,
    ) -> Option<DebugLaunchConfig> {
        let sdk = self.resolver.resolve().await?;
        match self.normalizer.normalize(config, &sdk).await {
            Ok(config) => Some(config),
            Err(e) => {
                info!(error = %e, "Cannot start debug session");
                self.resolver.host().notifier.show_error(&e.to_string()).await;
                None
            }
        }
    }

    /// Both phases for callers that substitute nothing in between.
    pub async fn resolve(&self, config: DebugLaunchConfig) -> Option<DebugLaunchConfig> {
        let config = self.resolve_debug_configuration(config);
        self.resolve_with_substituted_variables(config).await
    }

    /// Translate a configuration for the `cppdbg` backend. The companion
    /// extension is checked before the SDK is resolved.
    pub async fn resolve_secondary(&self, config: DebugLaunchConfig) -> Option<SecondaryDebugConfig> {
        if !self.translator.ensure_companion().await {
            return None;
        }
        let config = self.resolve_debug_configuration(config);
        let sdk = self.resolver.resolve().await?;
        self.translator.convert(config, &sdk).await
    }
}
