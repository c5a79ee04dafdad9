//! Path utilities.

use std::path::{Component, Path, PathBuf};

/// Project-level settings file names, in lookup order.
pub const PROJECT_SETTINGS_FILES: &[&str] = &["mojo-bridge.jsonc", "mojo-bridge.json"];

/// Get the mojo-bridge configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/mojo-bridge` if set
/// - `~/.config/mojo-bridge` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mojo-bridge"))
}

/// Get the mojo-bridge logs directory.
pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|p| p.join("logs"))
}

/// Find the first project settings file present in `project_root`.
pub fn project_settings_file(project_root: &Path) -> Option<PathBuf> {
    PROJECT_SETTINGS_FILES
        .iter()
        .map(|name| project_root.join(name))
        .find(|candidate| candidate.is_file())
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Resolve `path` against `base` when it is relative, then normalize.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_dir() {
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("mojo-bridge"));
        }
    }

    #[test]
    fn test_normalize() {
        let path = Path::new("/home/user/./project/../project/src");
        assert_eq!(normalize(path), PathBuf::from("/home/user/project/src"));
    }

    #[test]
    fn test_absolutize() {
        let base = Path::new("/work/space");
        assert_eq!(
            absolutize(Path::new("../env/bin"), base),
            PathBuf::from("/work/env/bin")
        );
        assert_eq!(
            absolutize(Path::new("/opt/env"), base),
            PathBuf::from("/opt/env")
        );
    }

    #[test]
    fn test_project_settings_file_prefers_jsonc() {
        let dir = tempdir().unwrap();
        assert!(project_settings_file(dir.path()).is_none());

        std::fs::write(dir.path().join("mojo-bridge.json"), "{}").unwrap();
        assert_eq!(
            project_settings_file(dir.path()),
            Some(dir.path().join("mojo-bridge.json"))
        );

        std::fs::write(dir.path().join("mojo-bridge.jsonc"), "{}").unwrap();
        assert_eq!(
            project_settings_file(dir.path()),
            Some(dir.path().join("mojo-bridge.jsonc"))
        );
    }
}
