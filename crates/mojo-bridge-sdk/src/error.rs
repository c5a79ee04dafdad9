//! SDK resolution error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for SDK operations.
pub type SdkResult<T> = Result<T, SdkError>;

/// Errors that can occur while resolving a Mojo SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    /// No active Python environment could be found or resolved.
    #[error("no Python environment is available to locate the Mojo SDK")]
    EnvironmentUnavailable,

    /// The installation descriptor is unreadable, undecodable, unparsable,
    /// or missing a required key.
    #[error("the Mojo installation at {home} is corrupted: {reason}")]
    InstallationCorrupted {
        home: PathBuf,
        #[source]
        reason: DescriptorError,
    },

    /// One or more tool paths of an installation do not exist.
    #[error("the Mojo installation at {} is incomplete, missing: {}", root.display(), display_paths(missing))]
    InstallationIncomplete { root: PathBuf, missing: Vec<PathBuf> },
}

impl SdkError {
    /// Whether this failure warrants a message in the editor.
    ///
    /// Incomplete packaged installs are only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::InstallationIncomplete { .. })
    }

    /// Short message shown to the user. The full error goes to the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::EnvironmentUnavailable => {
                "No Python environment could be found. Select an environment with Mojo installed."
                    .to_string()
            }
            Self::InstallationCorrupted { home, reason } => format!(
                "The Mojo installation at {} is corrupted: {}. Please reinstall it.",
                home.display(),
                reason.summary()
            ),
            Self::InstallationIncomplete { root, .. } => {
                format!("The Mojo installation at {} is incomplete.", root.display())
            }
        }
    }
}

/// Failures while loading a `modular.cfg` installation descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    #[error("missing key `{key}` in section [{section}] of {}", path.display())]
    MissingKey {
        path: PathBuf,
        section: String,
        key: String,
    },
}

impl DescriptorError {
    /// One-phrase description used in user-facing messages.
    pub fn summary(&self) -> String {
        match self {
            Self::Unreadable { .. } => "cannot read modular.cfg".to_string(),
            Self::Decode { .. } => "cannot decode modular.cfg".to_string(),
            Self::Parse { .. } => "cannot parse modular.cfg".to_string(),
            Self::MissingKey { key, .. } => format!("missing key `{key}` in modular.cfg"),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
