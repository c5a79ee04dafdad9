//! End-to-end resolution against on-disk and in-memory installations.

use mojo_bridge_sdk::{SdkFlavor, SdkKind};
use mojo_bridge_test_utils::fixtures::{descriptor_text, tool_paths};
use mojo_bridge_test_utils::{FakeHost, FakeProcessRunner, MemoryFileSystem, SdkLayout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_environment_home_install_resolves() {
    let layout = SdkLayout::new().with_environment_home().build();
    let host = FakeHost::new().with_environment(layout.prefix());

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Environment);
    assert_eq!(sdk.version(), "24.6.0");
    assert_eq!(sdk.runtime_path(), layout.environment_tools().runtime);
    assert_eq!(
        sdk.flavor(),
        &SdkFlavor::Home {
            home: layout.environment_home(),
            prefix: Some(layout.prefix()),
        }
    );
    assert!(host.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_workspace_sdk_takes_priority() {
    let layout = SdkLayout::new()
        .with_workspace_sdk()
        .with_environment_home()
        .build();
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_workspace_roots(vec![layout.workspace()]);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Internal);
    assert_eq!(sdk.debugger_path(), layout.workspace_tools().debugger);
    // The workspace source never consults the environment.
    assert_eq!(host.environments.lookup_count(), 0);
}

#[tokio::test]
async fn test_workspace_sdk_ignored_with_several_roots() {
    let layout = SdkLayout::new()
        .with_workspace_sdk()
        .with_environment_home()
        .build();
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_workspace_roots(vec![layout.workspace(), layout.root().to_path_buf()]);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Environment);
}

#[tokio::test]
async fn test_workspace_without_sdk_falls_through_silently() {
    let layout = SdkLayout::new().with_workspace().with_environment_home().build();
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_workspace_roots(vec![layout.workspace()]);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Environment);
    assert!(host.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_corrupted_workspace_sdk_reports_and_falls_through() {
    let layout = SdkLayout::new()
        .with_workspace_sdk()
        .with_environment_home()
        .build();
    std::fs::write(layout.workspace_home().join("modular.cfg"), "[mojo-max]\n").unwrap();
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_workspace_roots(vec![layout.workspace()]);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Environment);

    let messages = host.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("corrupted"), "{}", messages[0]);
}

#[tokio::test]
async fn test_missing_key_fails_whole_descriptor() {
    let layout = SdkLayout::new()
        .with_environment_home()
        .without_key("lldb_visualizers_path")
        .build();
    let host = FakeHost::new().with_environment(layout.prefix());

    assert!(host.resolver().resolve().await.is_none());
    let messages = host.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("lldb_visualizers_path"), "{}", messages[0]);
}

#[tokio::test]
async fn test_invalid_utf8_descriptor_is_corrupted() {
    let layout = SdkLayout::new()
        .with_environment_home()
        .with_raw_config(vec![0xff, 0xfe, 0x00])
        .build();
    let host = FakeHost::new().with_environment(layout.prefix());

    assert!(host.resolver().resolve().await.is_none());
    assert_eq!(host.notifier.count(), 1);
}

#[tokio::test]
async fn test_missing_version_defaults() {
    let layout = SdkLayout::new()
        .with_environment_home()
        .with_version(None)
        .build();
    let host = FakeHost::new().with_environment(layout.prefix());

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.version(), "0.0.0");
}

#[tokio::test]
async fn test_cached_descriptor_is_stable() {
    let layout = SdkLayout::new().with_environment_home().build();
    let host = FakeHost::new().with_environment(layout.prefix());
    let resolver = host.resolver();

    let first = resolver.resolve().await.expect("sdk");
    let second = resolver.resolve().await.expect("sdk");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(host.environments.lookup_count(), 1);

    let cached = resolver.cached().await.expect("cached");
    assert!(Arc::ptr_eq(&first, &cached));
}

#[tokio::test]
async fn test_invalidation_only_on_key_change() {
    let layout = SdkLayout::new().with_environment_home().build();
    let host = FakeHost::new().with_environment(layout.prefix());
    let resolver = host.resolver();
    let mut changes = resolver.subscribe();

    let first = resolver.resolve().await.expect("sdk");
    let key = layout.prefix().display().to_string();

    assert!(!resolver.invalidate_on_environment_change(&key).await);
    assert!(resolver.cached().await.is_some());
    assert!(changes.try_recv().is_err());

    assert!(resolver.invalidate_on_environment_change("/other/env").await);
    assert!(resolver.cached().await.is_none());
    assert_eq!(changes.try_recv().unwrap().environment_key, "/other/env");
    assert!(changes.try_recv().is_err());

    // A repeated notification for the same key is a no-op.
    assert!(!resolver.invalidate_on_environment_change("/other/env").await);

    let second = resolver.resolve().await.expect("sdk");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(host.environments.lookup_count(), 2);
}

#[tokio::test]
async fn test_first_observed_key_counts_as_change() {
    let host = FakeHost::new();
    let resolver = host.resolver();
    assert!(resolver.invalidate_on_environment_change("/env").await);
    assert!(!resolver.invalidate_on_environment_change("/env").await);
}

#[tokio::test]
async fn test_errors_shown_once_per_environment() {
    let host = FakeHost::new();
    let resolver = host.resolver();

    assert!(resolver.resolve().await.is_none());
    assert!(resolver.resolve().await.is_none());
    assert_eq!(host.notifier.count(), 1);
    assert!(host.notifier.messages()[0].contains("No Python environment"));

    assert!(resolver.invalidate_on_environment_change("/new/env").await);
    assert!(resolver.resolve().await.is_none());
    assert_eq!(host.notifier.count(), 2);
}

#[tokio::test]
async fn test_unresolvable_environment_is_unavailable() {
    let host = FakeHost::new();
    host.environments.select(Some("/not/registered"));

    assert!(host.resolver().resolve().await.is_none());
    assert_eq!(host.notifier.count(), 1);
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_lookup() {
    let layout = SdkLayout::new().with_environment_home().build();
    let host = FakeHost::new().with_environment(layout.prefix());
    host.environments.set_delay(Duration::from_millis(50));
    let resolver = host.resolver();

    let (a, b, c) = tokio::join!(resolver.resolve(), resolver.resolve(), resolver.resolve());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(host.environments.lookup_count(), 1);
}

#[tokio::test]
async fn test_result_from_before_invalidation_is_not_cached() {
    let layout = SdkLayout::new().with_environment_home().build();
    let host = FakeHost::new().with_environment(layout.prefix());
    host.environments.set_delay(Duration::from_millis(100));
    let resolver = host.resolver();

    let pending = tokio::spawn({
        let resolver = resolver.clone();
        async move { resolver.resolve().await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(resolver.invalidate_on_environment_change("/switched").await);

    let stale = pending.await.unwrap();
    assert!(stale.is_some());
    assert!(resolver.cached().await.is_none());
}

#[tokio::test]
async fn test_packaged_install_queries_version() {
    let layout = SdkLayout::new().with_packaged_environment().build();
    let runner = FakeProcessRunner::new().with_stdout("mojo --version", "mojo 24.6.1 (4487cd6e)\n");
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_runner(runner);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.flavor(), &SdkFlavor::Packaged);
    assert_eq!(sdk.version(), "24.6.1");
    assert!(!sdk.supports_file_launch());
    assert_eq!(
        sdk.unwrapped_runtime_path(),
        Some(layout.prefix().join("lib/mojo/bin/mojo").as_path())
    );
    assert_eq!(host.runner.count("mojo --version"), 1);
    assert!(sdk.process_environment(true).get("MODULAR_HOME").is_none());
}

#[tokio::test]
async fn test_packaged_version_query_failure_defaults() {
    let layout = SdkLayout::new().with_packaged_environment().build();
    let runner = FakeProcessRunner::new().with_exit("mojo --version", 1, "boom");
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_runner(runner);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.version(), "0.0.0");
}

#[tokio::test]
async fn test_incomplete_packaged_install_is_only_logged() {
    let layout = SdkLayout::new().with_packaged_environment().build();
    layout.remove("env/bin/mblack");
    let host = FakeHost::new().with_environment(layout.prefix());

    assert!(host.resolver().resolve().await.is_none());
    assert_eq!(host.notifier.count(), 0);
    // Missing paths are detected before spawning the runtime.
    assert_eq!(host.runner.count("mojo --version"), 0);
}

#[tokio::test]
async fn test_workspace_sdk_from_memory_filesystem() {
    let home = PathBuf::from("/ws/.derived");
    let tools = tool_paths(&home);
    let mut fs = MemoryFileSystem::new()
        .with_file(home.join("modular.cfg"), descriptor_text(&tools, Some("25.1.0"), None))
        .with_dir(&tools.visualizers_dir);
    for path in [
        &tools.language_server,
        &tools.formatter,
        &tools.debug_plugin,
        &tools.debug_adapter,
        &tools.runtime,
        &tools.debugger,
    ] {
        fs = fs.with_file(path, "");
    }

    let host = FakeHost::new()
        .with_fs(Arc::new(fs))
        .with_workspace_roots(vec![PathBuf::from("/ws")]);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert_eq!(sdk.kind(), SdkKind::Internal);
    assert_eq!(sdk.version(), "25.1.0");
    assert_eq!(sdk.language_server_path(), Path::new("/ws/.derived/bin/mojo-lsp-server"));

    let env = sdk.process_environment(false);
    assert_eq!(env.get("MODULAR_HOME").map(String::as_str), Some("/ws/.derived"));
    assert_eq!(env.get("MOJO_HOME").map(String::as_str), Some("/ws/.derived"));
}

#[tokio::test]
async fn test_scripting_check_is_memoised() {
    let layout = SdkLayout::new().with_environment_home().build();
    let runner = FakeProcessRunner::new().with_stdout("mojo-lldb -b -o", "101\n");
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_runner(runner);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert!(sdk.supports_scripting(host.runner.as_ref()).await);
    assert!(sdk.supports_scripting(host.runner.as_ref()).await);
    assert_eq!(host.runner.count("mojo-lldb"), 1);
}

#[tokio::test]
async fn test_scripting_unsupported_without_answer() {
    let layout = SdkLayout::new().with_environment_home().build();
    let runner = FakeProcessRunner::new().with_stdout("mojo-lldb", "error: no script interpreter\n");
    let host = FakeHost::new()
        .with_environment(layout.prefix())
        .with_runner(runner);

    let sdk = host.resolver().resolve().await.expect("sdk");
    assert!(!sdk.supports_scripting(host.runner.as_ref()).await);
}
