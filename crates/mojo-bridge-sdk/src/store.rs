//! Filesystem access and installation descriptor loading.

use crate::error::DescriptorError;
use async_trait::async_trait;
use ini::{Ini, ParseOption};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Name of the installation descriptor file.
pub const DESCRIPTOR_FILE: &str = "modular.cfg";

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Read-only filesystem operations needed during resolution.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a whole file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Stat a path.
    async fn metadata(&self, path: &Path) -> io::Result<EntryKind>;

    /// List the entries of a directory, in the order the filesystem yields them.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Filesystem backed by `tokio::fs`.
#[derive(Debug, Default, Clone)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn metadata(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = tokio::fs::metadata(path).await?;
        Ok(if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        })
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        Ok(paths)
    }
}

/// Reads installation descriptors and answers existence checks.
#[derive(Clone)]
pub struct ConfigStore {
    fs: Arc<dyn FileSystem>,
}

impl ConfigStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Whether `path` exists.
    pub async fn exists(&self, path: &Path) -> bool {
        self.fs.metadata(path).await.is_ok()
    }

    /// Stat `path`, surfacing the error for callers that want to log it.
    pub async fn stat(&self, path: &Path) -> io::Result<EntryKind> {
        self.fs.metadata(path).await
    }

    pub async fn read_bytes(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.fs.read(path).await
    }

    pub async fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.fs.read_dir(path).await
    }

    /// Read, decode and parse the descriptor at `path`.
    pub async fn load_descriptor(&self, path: &Path) -> Result<Ini, DescriptorError> {
        let bytes = self
            .fs
            .read(path)
            .await
            .map_err(|source| DescriptorError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        let text = String::from_utf8(bytes).map_err(|source| DescriptorError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

        trace!(path = %path.display(), bytes = text.len(), "Parsing installation descriptor");

        // Values are paths and are taken as written.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        Ini::load_from_str_opt(&text, options).map_err(|source| DescriptorError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
