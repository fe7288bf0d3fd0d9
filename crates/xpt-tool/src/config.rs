//! Tool configuration
//!
//! Loaded from TOML; every section is optional.
//!
//! ```toml
//! settings_file = "xpath-tester.toml"
//!
//! [parse]
//! preserve_whitespace = false
//!
//! [logging]
//! filter = "xpt_tool=debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use xpt_engine::ParseOptions;

use crate::error::{ToolError, ToolResult};
use crate::settings::{FileSettings, InMemorySettings, SettingsProvider};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// XML parsing options
    pub parse: ParseConfig,
    /// TOML file backing the user settings; in memory when unset
    pub settings_file: Option<PathBuf>,
    /// Log output
    pub logging: LoggingConfig,
}

impl ToolConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With whitespace-only text nodes kept
    #[inline]
    #[must_use]
    pub fn with_preserve_whitespace(mut self, preserve: bool) -> Self {
        self.parse.preserve_whitespace = preserve;
        self
    }

    /// With a settings file
    #[inline]
    #[must_use]
    pub fn with_settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_file = Some(path.into());
        self
    }

    /// With logging configuration
    #[inline]
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Config`] on invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> ToolResult<Self> {
        toml::from_str(text).map_err(|e| ToolError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> ToolResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ToolError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Engine parse options
    #[inline]
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions::default().with_preserve_whitespace(self.parse.preserve_whitespace)
    }

    /// Settings store described by this configuration
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Settings`] if the settings file exists but is
    /// unreadable.
    pub fn settings_provider(&self) -> ToolResult<Arc<dyn SettingsProvider>> {
        Ok(match &self.settings_file {
            Some(path) => Arc::new(FileSettings::open(path.clone())?),
            None => Arc::new(InMemorySettings::new()),
        })
    }
}

/// XML parsing section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// Keep whitespace-only text nodes
    pub preserve_whitespace: bool,
}

/// Logging section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Create new logging configuration
    #[must_use]
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            filter: filter.into(),
            format,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let config = ToolConfig::from_toml_str("").unwrap();
        assert_eq!(config, ToolConfig::default());
        assert_eq!(config.logging.filter, "info");
        assert!(!config.parse_options().preserve_whitespace);
    }

    #[test]
    fn sections_override_defaults() {
        let config = ToolConfig::from_toml_str(
            r#"
            settings_file = "/tmp/settings.toml"

            [parse]
            preserve_whitespace = true

            [logging]
            filter = "xpt_tool=trace"
            format = "json"
            "#,
        )
        .unwrap();
        assert!(config.parse.preserve_whitespace);
        assert_eq!(config.settings_file, Some(PathBuf::from("/tmp/settings.toml")));
        assert_eq!(config.logging, LoggingConfig::new("xpt_tool=trace", LogFormat::Json));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ToolConfig::from_toml_str("[parse]\nstrict = true\n").unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
    }

    #[test]
    fn builders_compose() {
        let config = ToolConfig::new()
            .with_preserve_whitespace(true)
            .with_settings_file("s.toml")
            .with_logging(LoggingConfig::new("debug", LogFormat::Pretty));
        assert!(config.parse_options().preserve_whitespace);
        assert_eq!(config.settings_file.as_deref(), Some(Path::new("s.toml")));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ToolConfig::load("/nonexistent/xpt.toml").unwrap_err();
        assert!(matches!(err, ToolError::Config(_)));
    }
}
