//! Mojo SDK discovery for mojo-bridge.
//!
//! This crate locates a Mojo toolchain and describes it as an immutable
//! [`SdkDescriptor`]:
//! - Reading `modular.cfg` installation descriptors ([`ConfigStore`])
//! - Verifying every tool path before a descriptor exists
//! - Three competing sources: workspace monorepo build, environment
//!   `modular.cfg`, and packaged-distribution layout
//! - A single cache slot invalidated when the Python environment changes
//! - Environment variables contributed to spawned tools
//!
//! # Example
//!
//! ```ignore
//! let resolver = SdkResolver::new(host);
//! let mut changes = resolver.subscribe();
//!
//! if let Some(sdk) = resolver.resolve().await {
//!     println!("Mojo {} at {}", sdk.version(), sdk.runtime_path().display());
//! }
//!
//! // The host forwards environment switches from its picker.
//! resolver.invalidate_on_environment_change("/envs/nightly").await;
//! ```

pub mod descriptor;
pub mod error;
pub mod host;
pub mod resolver;
pub mod store;

pub use descriptor::{SdkDescriptor, SdkFlavor, SdkKind, ToolPaths};
pub use error::{DescriptorError, SdkError, SdkResult};
pub use host::{
    EnvironmentProvider, EnvironmentRecord, ExtensionRegistry, Notifier, ProcessOutput,
    ProcessRunner, TokioProcessRunner, Workspace,
};
pub use resolver::{ResolverHost, SdkChanged, SdkResolver};
pub use store::{ConfigStore, EntryKind, FileSystem, TokioFileSystem};
