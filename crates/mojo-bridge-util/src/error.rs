//! Error type for settings and other host-side files.
//!
//! The SDK and debug crates define their own `thiserror` enums.

use std::fmt;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// A failure to read or interpret a host-side file.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read.
    Io,
    /// The file was read but its contents are invalid.
    Config,
}

impl Error {
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Reading `path` failed.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::with_source(
            ErrorKind::Io,
            format!("failed to read {}: {source}", path.display()),
            source,
        )
    }

    /// The contents of `origin` are invalid.
    pub fn config<E>(origin: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::with_source(
            ErrorKind::Config,
            format!("invalid settings in {origin}: {source}"),
            source,
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}
