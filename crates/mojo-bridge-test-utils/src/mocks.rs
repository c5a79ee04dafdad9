//! In-memory fakes for the host collaborators.
//!
//! Every fake records how it was used so tests can assert on lookup counts,
//! spawned commands and user-facing messages.

use async_trait::async_trait;
use mojo_bridge_sdk::{
    EntryKind, EnvironmentProvider, EnvironmentRecord, ExtensionRegistry, FileSystem, Notifier,
    ProcessOutput, ProcessRunner, ResolverHost, SdkResolver, TokioFileSystem, Workspace,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Filesystem held entirely in memory.
///
/// Directories are implied by the files beneath them; listings come back in
/// insertion order.
#[derive(Default)]
pub struct MemoryFileSystem {
    entries: Mutex<Vec<(PathBuf, Option<Vec<u8>>)>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with content.
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Add an empty directory.
    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.entries
            .lock()
            .unwrap()
            .push((path.as_ref().to_path_buf(), None));
        self
    }

    /// Add or replace a file after construction.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(p, _)| p != &path);
        entries.push((path, Some(content.into())));
    }

    /// Remove a file, or a directory and everything under it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.entries
            .lock()
            .unwrap()
            .retain(|(p, _)| !p.starts_with(path));
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let entries = self.entries.lock().unwrap();
        match entries.iter().find(|(p, _)| p == path) {
            Some((_, Some(content))) => Ok(content.clone()),
            Some((_, None)) => Err(io::Error::other(format!(
                "{} is a directory",
                path.display()
            ))),
            None => Err(not_found(path)),
        }
    }

    async fn metadata(&self, path: &Path) -> io::Result<EntryKind> {
        let entries = self.entries.lock().unwrap();
        if let Some((_, content)) = entries.iter().find(|(p, _)| p == path) {
            return Ok(if content.is_some() {
                EntryKind::File
            } else {
                EntryKind::Directory
            });
        }
        if entries.iter().any(|(p, _)| p.starts_with(path)) {
            return Ok(EntryKind::Directory);
        }
        Err(not_found(path))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = self.entries.lock().unwrap();
        let mut children: Vec<PathBuf> = Vec::new();
        let mut found = false;
        for (p, _) in entries.iter() {
            let Ok(rest) = p.strip_prefix(path) else {
                continue;
            };
            found = true;
            if let Some(first) = rest.components().next() {
                let child = path.join(first);
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }
        if found {
            Ok(children)
        } else {
            Err(not_found(path))
        }
    }
}

/// Workspace with a settable list of roots.
#[derive(Default)]
pub struct FakeWorkspace {
    roots: Mutex<Vec<PathBuf>>,
}

impl FakeWorkspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots: Mutex::new(roots),
        }
    }

    pub fn set_roots(&self, roots: Vec<PathBuf>) {
        *self.roots.lock().unwrap() = roots;
    }
}

impl Workspace for FakeWorkspace {
    fn roots(&self) -> Vec<PathBuf> {
        self.roots.lock().unwrap().clone()
    }
}

/// Environment picker with a settable selection.
#[derive(Default)]
pub struct FakeEnvironmentProvider {
    active: Mutex<Option<String>>,
    records: Mutex<HashMap<String, EnvironmentRecord>>,
    lookups: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl FakeEnvironmentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment whose id is the display form of `prefix`.
    pub fn add_environment(&self, prefix: impl Into<PathBuf>) -> String {
        let prefix = prefix.into();
        let id = prefix.display().to_string();
        self.records.lock().unwrap().insert(
            id.clone(),
            EnvironmentRecord {
                id: id.clone(),
                sys_prefix: prefix,
            },
        );
        id
    }

    /// Select the active environment path. `None` clears the selection.
    pub fn select(&self, id: Option<&str>) {
        *self.active.lock().unwrap() = id.map(str::to_string);
    }

    /// Sleep this long before answering `active_environment_path`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// How many times the active environment was queried.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentProvider for FakeEnvironmentProvider {
    async fn active_environment_path(&self) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.active.lock().unwrap().clone()
    }

    async fn resolve_environment(&self, path: &str) -> Option<EnvironmentRecord> {
        self.records.lock().unwrap().get(path).cloned()
    }
}

/// A process spawned through [`FakeProcessRunner`].
#[derive(Debug, Clone)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

impl ProcessInvocation {
    /// `<program file name> <args...>`, the form responses are keyed by.
    pub fn command_line(&self) -> String {
        command_line(&self.program, &self.args)
    }
}

fn command_line(program: &Path, args: &[String]) -> String {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    std::iter::once(name)
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Process runner returning canned output.
///
/// Responses are keyed by `<program file name> <args...>`; an exact match
/// wins over a prefix match. Unmatched commands succeed with empty output.
#[derive(Clone, Default)]
pub struct FakeProcessRunner {
    invocations: Arc<Mutex<Vec<ProcessInvocation>>>,
    responses: Arc<Mutex<Vec<(String, Result<ProcessOutput, String>)>>>,
}

impl FakeProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeed with `stdout` for commands matching `command`.
    pub fn with_stdout(self, command: &str, stdout: &str) -> Self {
        self.respond(
            command,
            Ok(ProcessOutput {
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
                success: true,
            }),
        );
        self
    }

    /// Exit with `code` and `stderr` for commands matching `command`.
    pub fn with_exit(self, command: &str, code: i32, stderr: &str) -> Self {
        self.respond(
            command,
            Ok(ProcessOutput {
                stdout: String::new(),
                stderr: stderr.to_string(),
                exit_code: code,
                success: code == 0,
            }),
        );
        self
    }

    /// Fail to spawn commands matching `command`.
    pub fn with_spawn_error(self, command: &str, message: &str) -> Self {
        self.respond(command, Err(message.to_string()));
        self
    }

    fn respond(&self, command: &str, response: Result<ProcessOutput, String>) {
        self.responses
            .lock()
            .unwrap()
            .push((command.to_string(), response));
    }

    pub fn invocations(&self) -> Vec<ProcessInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Number of spawns whose command line starts with `command`.
    pub fn count(&self, command: &str) -> usize {
        self.invocations
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.command_line().starts_with(command))
            .count()
    }
}

#[async_trait]
impl ProcessRunner for FakeProcessRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        env: &BTreeMap<String, String>,
    ) -> io::Result<ProcessOutput> {
        self.invocations.lock().unwrap().push(ProcessInvocation {
            program: program.to_path_buf(),
            args: args.to_vec(),
            env: env.clone(),
        });

        let line = command_line(program, args);
        let responses = self.responses.lock().unwrap();
        let response = responses
            .iter()
            .find(|(cmd, _)| *cmd == line)
            .or_else(|| responses.iter().find(|(cmd, _)| line.starts_with(cmd.as_str())))
            .map(|(_, response)| response.clone());

        match response {
            Some(Ok(output)) => Ok(output),
            Some(Err(message)) => Err(io::Error::other(message)),
            None => Ok(ProcessOutput {
                success: true,
                ..ProcessOutput::default()
            }),
        }
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_error(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Extension registry with a fixed set of installed ids.
#[derive(Default)]
pub struct FakeExtensions {
    installed: Mutex<HashSet<String>>,
}

impl FakeExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installed(self, id: &str) -> Self {
        self.installed.lock().unwrap().insert(id.to_string());
        self
    }
}

#[async_trait]
impl ExtensionRegistry for FakeExtensions {
    async fn is_installed(&self, extension_id: &str) -> bool {
        self.installed.lock().unwrap().contains(extension_id)
    }
}

/// All resolver collaborators, wired to fakes.
///
/// The filesystem defaults to the real one so fakes compose with
/// [`crate::fixtures::SdkLayout`].
pub struct FakeHost {
    pub fs: Arc<dyn FileSystem>,
    pub workspace: Arc<FakeWorkspace>,
    pub environments: Arc<FakeEnvironmentProvider>,
    pub runner: Arc<FakeProcessRunner>,
    pub notifier: Arc<RecordingNotifier>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            fs: Arc::new(TokioFileSystem),
            workspace: Arc::new(FakeWorkspace::default()),
            environments: Arc::new(FakeEnvironmentProvider::new()),
            runner: Arc::new(FakeProcessRunner::new()),
            notifier: Arc::new(RecordingNotifier::new()),
        }
    }

    /// Register the environment at `prefix` and make it active.
    pub fn with_environment(self, prefix: impl Into<PathBuf>) -> Self {
        let id = self.environments.add_environment(prefix);
        self.environments.select(Some(&id));
        self
    }

    pub fn with_workspace_roots(self, roots: Vec<PathBuf>) -> Self {
        self.workspace.set_roots(roots);
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_runner(mut self, runner: FakeProcessRunner) -> Self {
        self.runner = Arc::new(runner);
        self
    }

    pub fn host(&self) -> ResolverHost {
        ResolverHost {
            fs: Arc::clone(&self.fs),
            workspace: self.workspace.clone(),
            environments: self.environments.clone(),
            runner: self.runner.clone(),
            notifier: self.notifier.clone(),
        }
    }

    /// A fresh resolver over these collaborators.
    pub fn resolver(&self) -> SdkResolver {
        SdkResolver::new(self.host())
    }
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}
