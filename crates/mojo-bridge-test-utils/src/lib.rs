//! Testing utilities, fixtures, and fakes for mojo-bridge.
//!
//! - **Fixtures**: on-disk SDK layouts (home-path, packaged, workspace monorepo)
//! - **Mocks**: in-memory fakes for every host collaborator of the resolver
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use mojo_bridge_test_utils::{fixtures::SdkLayout, mocks::FakeHost};
//!
//! #[tokio::test]
//! async fn resolves_environment_install() {
//!     let layout = SdkLayout::new().with_environment_home().build();
//!     let host = FakeHost::new().with_environment(layout.prefix());
//!     let resolver = host.resolver();
//!     assert!(resolver.resolve().await.is_some());
//! }
//! ```

pub mod fixtures;
pub mod mocks;

pub use fixtures::{BuiltSdkLayout, SdkLayout};
pub use mocks::{
    FakeEnvironmentProvider, FakeExtensions, FakeHost, FakeProcessRunner, FakeWorkspace,
    MemoryFileSystem, RecordingNotifier,
};
