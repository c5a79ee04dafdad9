//! Logging initialization.
//!
//! Stdout carries the JSON output, so logs only ever go to stderr and an
//! optional file.

use mojo_bridge_util::log::{self, default_log_path, LogConfig, LogLevel};
use std::path::PathBuf;

/// Initialize logging. `--verbose` wins over the configured level; without
/// either only warnings are printed.
pub fn init_logging(verbose: bool, configured: Option<LogLevel>, file: Option<PathBuf>) {
    let level = if verbose {
        LogLevel::Debug
    } else {
        configured.unwrap_or(LogLevel::Warn)
    };

    log::init(LogConfig {
        print: true,
        level,
        include_location: verbose,
        file: log_file(verbose, file, default_log_path()),
    });
}

/// An explicit `--log-file` always applies. Verbose runs are also kept in
/// the default log file.
fn log_file(verbose: bool, explicit: Option<PathBuf>, default: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or(if verbose { default } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_selection() {
        let explicit = Some(PathBuf::from("/tmp/explicit.log"));
        let default = Some(PathBuf::from("/home/u/.config/mojo-bridge/logs/mojo-bridge.log"));

        assert_eq!(log_file(false, explicit.clone(), default.clone()), explicit);
        assert_eq!(log_file(true, explicit.clone(), default.clone()), explicit);
        assert_eq!(log_file(true, None, default.clone()), default);
        assert_eq!(log_file(false, None, default), None);
    }
}
