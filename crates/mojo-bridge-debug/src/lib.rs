//! Debug launch configuration resolution for Mojo.
//!
//! Two backends are supported:
//! - `mojo-lldb`, the LLDB-based adapter shipped with the SDK. Partial
//!   configurations are completed by [`DebugConfigNormalizer`]: file launches
//!   become `mojo run` invocations, init commands load the Mojo plugin and
//!   visualizers, and the SDK environment is injected.
//! - `cppdbg`, the GDB-based backend of the C/C++ extension. Configurations
//!   are rewritten into its schema by [`translator::translate`].
//!
//! [`DebugConfigurationProvider`] ties both to an [`SdkResolver`](mojo_bridge_sdk::SdkResolver)
//! and reports failures to the user.

pub mod args;
pub mod config;
pub mod error;
pub mod normalizer;
pub mod provider;
pub mod translator;

pub use config::{default_configuration, DebugLaunchConfig, RequestKind};
pub use error::{DebugError, DebugResult};
pub use normalizer::{DebugConfigNormalizer, NormalizerOptions};
pub use provider::DebugConfigurationProvider;
pub use translator::{DebugConfigTranslator, EnvironmentEntry, SecondaryDebugConfig};
