//! Owns the running language server and restarts it when the SDK changes.

use crate::error::{LspError, LspResult};
use crate::launch::ServerLaunch;
use async_trait::async_trait;
use mojo_bridge_sdk::SdkResolver;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A started language server.
#[derive(Debug)]
pub struct ServerHandle {
    launch: ServerLaunch,
    child: Option<Child>,
}

impl ServerHandle {
    pub fn new(launch: ServerLaunch, child: Child) -> Self {
        Self {
            launch,
            child: Some(child),
        }
    }

    /// A handle with no process behind it.
    pub fn detached(launch: ServerLaunch) -> Self {
        Self {
            launch,
            child: None,
        }
    }

    pub fn launch(&self) -> &ServerLaunch {
        &self.launch
    }

    /// OS process id, while the process runs.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Kill the process and wait for it to exit.
    pub async fn stop(&mut self) -> LspResult<()> {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                // Already exited.
                debug!(error = %e, "Language server kill failed");
            }
        }
        Ok(())
    }
}

/// Starts language server processes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServerSpawner: Send + Sync {
    async fn spawn(&self, launch: &ServerLaunch) -> LspResult<ServerHandle>;
}

/// Spawner backed by `tokio::process`, with stdio piped for the client
/// transport.
#[derive(Debug, Default, Clone)]
pub struct TokioServerSpawner;

#[async_trait]
impl ServerSpawner for TokioServerSpawner {
    async fn spawn(&self, launch: &ServerLaunch) -> LspResult<ServerHandle> {
        info!(language = %launch.language, command = %launch.command.display(), "Spawning language server");

        let child = Command::new(&launch.command)
            .args(&launch.args)
            .envs(&launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LspError::Spawn {
                command: launch.command.clone(),
                source,
            })?;

        Ok(ServerHandle::new(launch.clone(), child))
    }
}

/// Settings applied to every launch.
#[derive(Debug, Clone, Default)]
pub struct SupervisorOptions {
    pub telemetry: bool,
    pub extra_args: Vec<String>,
}

/// Keeps at most one language server running for the current SDK.
pub struct LanguageClientSupervisor {
    resolver: SdkResolver,
    spawner: Arc<dyn ServerSpawner>,
    options: SupervisorOptions,
    current: Mutex<Option<ServerHandle>>,
    starts: AtomicUsize,
}

impl LanguageClientSupervisor {
    pub fn new(
        resolver: SdkResolver,
        spawner: Arc<dyn ServerSpawner>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            resolver,
            spawner,
            options,
            current: Mutex::new(None),
            starts: AtomicUsize::new(0),
        }
    }

    /// Launch settings for the current SDK, without starting anything.
    pub async fn server_launch(&self) -> LspResult<ServerLaunch> {
        let sdk = self.resolver.resolve().await.ok_or(LspError::SdkUnavailable)?;
        Ok(ServerLaunch::from_sdk(&sdk, self.options.telemetry)
            .with_args(self.options.extra_args.iter().cloned()))
    }

    /// Start the server unless one is already running.
    pub async fn start(&self) -> LspResult<()> {
        let mut current = self.current.lock().await;
        if current.is_some() {
            debug!("Language server already running");
            return Ok(());
        }
        *current = Some(self.spawn().await?);
        Ok(())
    }

    /// Stop the running server, if any.
    pub async fn stop(&self) -> LspResult<()> {
        let mut current = self.current.lock().await;
        if let Some(mut handle) = current.take() {
            info!(pid = ?handle.pid(), "Stopping language server");
            handle.stop().await?;
        }
        Ok(())
    }

    /// Stop the running server, then start a new one.
    pub async fn restart(&self) -> LspResult<()> {
        let mut current = self.current.lock().await;
        if let Some(mut handle) = current.take() {
            info!(pid = ?handle.pid(), "Restarting language server");
            handle.stop().await?;
        }
        *current = Some(self.spawn().await?);
        Ok(())
    }

    async fn spawn(&self) -> LspResult<ServerHandle> {
        let launch = self.server_launch().await?;
        let handle = self.spawner.spawn(&launch).await?;
        self.starts.fetch_add(1, Ordering::SeqCst);
        info!(command = %launch.command.display(), pid = ?handle.pid(), "Language server started");
        Ok(handle)
    }

    pub async fn is_running(&self) -> bool {
        self.current.lock().await.is_some()
    }

    /// Launch settings of the running server.
    pub async fn current_launch(&self) -> Option<ServerLaunch> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|handle| handle.launch().clone())
    }

    /// Number of servers started so far.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Restart the server on every SDK change. The task runs until aborted.
    pub fn watch(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.resolver.subscribe();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        info!(environment = %change.environment_key, "SDK changed, restarting language server");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Missed SDK change notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                if let Err(e) = self.restart().await {
                    error!(error = %e, "Failed to restart language server");
                }
            }
        })
    }
}
