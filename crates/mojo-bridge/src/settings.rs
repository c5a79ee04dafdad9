//! User and project settings.
//!
//! Settings are read from two JSONC files; later sources override earlier:
//! 1. Global settings from `~/.config/mojo-bridge/config.json`
//! 2. Project settings from `mojo-bridge.jsonc` or `mojo-bridge.json` in the
//!    working directory

use mojo_bridge_debug::NormalizerOptions;
use mojo_bridge_lsp::format::DEFAULT_LINE_LENGTH;
use mojo_bridge_lsp::SupervisorOptions;
use mojo_bridge_util::log::LogLevel;
use crate::jsonc;
use mojo_bridge_util::{path, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the global settings file inside the config directory.
pub const GLOBAL_SETTINGS_FILE: &str = "config.json";

/// Merged settings. Every field is optional so that a project file only
/// overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Whether tools may send telemetry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<bool>,

    /// Python environment prefix to use instead of the active one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_prefix: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<FormatterSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsp: Option<LspSettings>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebugSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_visualizers: Option<bool>,
}

impl DebugSettings {
    fn merge(self, other: Self) -> Self {
        Self {
            init_timeout_secs: merge_option(self.init_timeout_secs, other.init_timeout_secs),
            sort_visualizers: merge_option(self.sort_visualizers, other.sort_visualizers),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatterSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_length: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LspSettings {
    /// Extra arguments for `mojo-lsp-server`, such as include directories.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionSettings {
    /// Editor extensions known to be installed, such as `ms-vscode.cpptools`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<Vec<String>>,
}

impl Settings {
    /// Load settings from the global config directory and `project_dir`.
    pub async fn load(project_dir: Option<&Path>) -> Result<(Self, Vec<PathBuf>)> {
        let global_dir = path::config_dir();
        Self::load_from(global_dir.as_deref(), project_dir).await
    }

    /// Load settings from explicit directories. Returns the files read, in
    /// merge order.
    pub async fn load_from(
        global_dir: Option<&Path>,
        project_dir: Option<&Path>,
    ) -> Result<(Self, Vec<PathBuf>)> {
        let mut settings = Settings::default();
        let mut sources = Vec::new();

        if let Some(dir) = global_dir {
            let path = dir.join(GLOBAL_SETTINGS_FILE);
            if path.is_file() {
                settings = settings.merge(Self::load_file(&path).await?);
                sources.push(path);
            }
        }

        if let Some(path) = project_dir.and_then(path::project_settings_file) {
            settings = settings.merge(Self::load_file(&path).await?);
            sources.push(path);
        }

        tracing::debug!(?sources, "Loaded settings");
        Ok((settings, sources))
    }

    /// Load settings from a single file.
    pub async fn load_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io(path, e))?;
        Self::parse_jsonc(&content, &path.display().to_string())
    }

    /// Parse JSONC (JSON with comments).
    pub fn parse_jsonc(content: &str, source: &str) -> Result<Self> {
        serde_json::from_str(&jsonc::to_json(content)).map_err(|e| Error::config(source, e))
    }

    /// Merge another settings object into this one (other takes precedence).
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: merge_option(self.log_level, other.log_level),
            telemetry: merge_option(self.telemetry, other.telemetry),
            environment_prefix: merge_option(self.environment_prefix, other.environment_prefix),
            debug: match (self.debug, other.debug) {
                (Some(base), Some(other)) => Some(base.merge(other)),
                (base, None) => base,
                (None, other) => other,
            },
            formatter: merge_option(self.formatter, other.formatter),
            lsp: merge_option(self.lsp, other.lsp),
            extensions: merge_option(self.extensions, other.extensions),
        }
    }

    /// Configured log level, if it names a known level.
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Telemetry is on unless turned off.
    pub fn telemetry(&self) -> bool {
        self.telemetry.unwrap_or(true)
    }

    pub fn normalizer_options(&self) -> NormalizerOptions {
        let defaults = NormalizerOptions::default();
        let debug = self.debug.clone().unwrap_or_default();
        NormalizerOptions {
            telemetry: self.telemetry(),
            init_timeout_secs: debug.init_timeout_secs.unwrap_or(defaults.init_timeout_secs),
            sort_visualizers: debug.sort_visualizers.unwrap_or(defaults.sort_visualizers),
        }
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            telemetry: self.telemetry(),
            extra_args: self
                .lsp
                .as_ref()
                .and_then(|lsp| lsp.extra_args.clone())
                .unwrap_or_default(),
        }
    }

    pub fn line_length(&self) -> u32 {
        self.formatter
            .as_ref()
            .and_then(|f| f.line_length)
            .unwrap_or(DEFAULT_LINE_LENGTH)
    }

    pub fn installed_extensions(&self) -> Vec<String> {
        self.extensions
            .as_ref()
            .and_then(|e| e.installed.clone())
            .unwrap_or_default()
    }
}

fn merge_option<T>(base: Option<T>, other: Option<T>) -> Option<T> {
    match (base, other) {
        (_, Some(o)) => Some(o),
        (b, None) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mojo_bridge_util::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_parse_jsonc() {
        let input = r#"{
            // line comment
            "logLevel": "debug", /* block
            comment */ "telemetry": false,
            "lsp": { "extraArgs": ["-I", "//not/a/comment",] },
        }"#;
        let settings = Settings::parse_jsonc(input, "test").unwrap();
        assert_eq!(settings.log_level(), Some(LogLevel::Debug));
        assert_eq!(settings.telemetry, Some(false));
        assert_eq!(
            settings.supervisor_options().extra_args,
            vec!["-I".to_string(), "//not/a/comment".to_string()]
        );
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.telemetry());
        assert_eq!(settings.line_length(), DEFAULT_LINE_LENGTH);
        assert!(settings.installed_extensions().is_empty());

        let options = settings.normalizer_options();
        let defaults = NormalizerOptions::default();
        assert_eq!(options.init_timeout_secs, defaults.init_timeout_secs);
        assert_eq!(options.sort_visualizers, defaults.sort_visualizers);
    }

    #[test]
    fn test_merge_project_over_global() {
        let global = Settings::parse_jsonc(
            r#"{"telemetry": false, "debug": {"initTimeoutSecs": 60, "sortVisualizers": false}}"#,
            "global",
        )
        .unwrap();
        let project = Settings::parse_jsonc(
            r#"{"debug": {"initTimeoutSecs": 10}, "formatter": {"lineLength": 100}}"#,
            "project",
        )
        .unwrap();

        let merged = global.merge(project);
        assert!(!merged.telemetry());
        assert_eq!(merged.line_length(), 100);

        let options = merged.normalizer_options();
        assert_eq!(options.init_timeout_secs, 10);
        assert!(!options.sort_visualizers);
        assert!(!options.telemetry);
    }

    #[test]
    fn test_invalid_settings_is_config_error() {
        let err = Settings::parse_jsonc(r#"{"telemetry": "yes"}"#, "bad.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn test_unreadable_settings_is_io_error() {
        let dir = tempdir().unwrap();
        let err = Settings::load_file(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains(&dir.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_load_from_directories() {
        let global = tempdir().unwrap();
        let project = tempdir().unwrap();
        std::fs::write(
            global.path().join(GLOBAL_SETTINGS_FILE),
            r#"{"extensions": {"installed": ["ms-vscode.cpptools"]}, "logLevel": "warn"}"#,
        )
        .unwrap();
        std::fs::write(
            project.path().join("mojo-bridge.jsonc"),
            "{\n  // project wins\n  \"logLevel\": \"trace\"\n}\n",
        )
        .unwrap();

        let (settings, sources) = Settings::load_from(Some(global.path()), Some(project.path()))
            .await
            .unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(settings.log_level(), Some(LogLevel::Trace));
        assert_eq!(settings.installed_extensions(), vec!["ms-vscode.cpptools".to_string()]);
    }

    #[tokio::test]
    async fn test_load_from_missing_files() {
        let empty = tempdir().unwrap();
        let (settings, sources) = Settings::load_from(Some(empty.path()), Some(empty.path()))
            .await
            .unwrap();
        assert!(sources.is_empty());
        assert_eq!(settings, Settings::default());
    }
}
