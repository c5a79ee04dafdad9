//! Debug configuration error types.

use thiserror::Error;

/// Result type for debug configuration operations.
pub type DebugResult<T> = Result<T, DebugError>;

/// Reasons a debug configuration cannot be completed.
///
/// All of these are usage errors: they are shown to the user and are not
/// logged as faults.
#[derive(Debug, Error)]
pub enum DebugError {
    /// The resolved SDK cannot run source files directly under the debugger.
    #[error(
        "Debugging `{file}` directly is not supported by this Mojo installation. \
         Packaged installs can only debug prebuilt executables; build the program \
         with `mojo build` and debug the binary instead."
    )]
    FileLaunchUnsupported { file: String },

    /// The target file is not a Mojo source file.
    #[error("`{file}` is not a Mojo file. Only `.mojo` and `.🔥` files can be debugged.")]
    UnsupportedExtension { file: String },

    /// An argument cannot be represented in a single shell-quoted string.
    #[error("The argument {argument:?} cannot be passed to the debugger: {reason}")]
    UnquotableArgument { argument: String, reason: String },

    /// The companion extension the secondary backend relies on is not installed.
    #[error("The `{extension}` extension is required to debug with `{debug_type}`. Please install it.")]
    CompanionToolMissing {
        extension: String,
        debug_type: String,
    },
}
