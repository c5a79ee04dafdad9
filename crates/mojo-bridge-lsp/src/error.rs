//! Language server and formatter error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for LSP operations.
pub type LspResult<T> = Result<T, LspError>;

/// Errors that can occur while launching Mojo tools.
#[derive(Debug, Error)]
pub enum LspError {
    /// No SDK could be resolved. The resolver has already told the user.
    #[error("No Mojo SDK is available")]
    SdkUnavailable,

    /// The tool could not be started.
    #[error("Failed to start {}: {source}", command.display())]
    Spawn {
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The formatter exited unsuccessfully.
    #[error("Formatting failed: {0}")]
    FormatFailed(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LspError {
    /// Create a formatting error.
    pub fn format_failed(message: impl Into<String>) -> Self {
        Self::FormatFailed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (LspError::SdkUnavailable, "No Mojo SDK is available"),
            (
                LspError::format_failed("cannot parse"),
                "Formatting failed: cannot parse",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_spawn_error_names_command() {
        let err = LspError::Spawn {
            command: PathBuf::from("/env/bin/mojo-lsp-server"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to start /env/bin/mojo-lsp-server: not found"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LspError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }
}
