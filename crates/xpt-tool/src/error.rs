//! Error types for the tool
//!
//! Provides error handling for:
//! - XML parse and XPath evaluation failures surfaced to the user
//! - Settings store and clipboard failures
//! - Configuration loading
//! - Async runtime availability
//! - Tool host registration

use xpt_engine::{ErrorKind, XPathError, XmlError};

/// Main tool error type
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Malformed XML input
    #[error("XML error: {0}")]
    Parse(#[from] XmlError),

    /// Invalid, unsupported or failing XPath expression
    #[error("XPath error: {0}")]
    Evaluation(#[from] XPathError),

    /// Settings store failure
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Clipboard failure
    #[error("clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// No async runtime, or a background task died
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Tool host failure
    #[error("host error: {0}")]
    Host(#[from] HostError),

    /// Superseded by a newer request
    #[error("operation cancelled")]
    Cancelled,
}

impl ToolError {
    /// Check if error is a cancellation
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Engine error classification, if this came from the engine
    #[inline]
    #[must_use]
    pub fn engine_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Parse(err) => Some(err.kind()),
            Self::Evaluation(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Message shown in the error display
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse(err) => err.to_string(),
            Self::Evaluation(err) => err.to_string(),
            other => other.to_string(),
        }
    }
}

/// Settings store errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading or writing the backing file failed
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not valid TOML
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values could not be written as TOML
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Stored value has the wrong shape for the setting
    #[error("setting '{key}' has an unexpected value: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Clipboard errors
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    /// Clipboard could not be opened or written
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}

/// Tool host errors
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A tool with the same name is already registered
    #[error("tool '{0}' is already registered")]
    DuplicateTool(String),

    /// No tool with that name
    #[error("tool '{0}' is not registered")]
    UnknownTool(String),
}

/// Result type alias
pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_omits_category_prefix() {
        let err = ToolError::from(XmlError::UnclosedElement {
            name: "root".to_string(),
        });
        assert_eq!(err.user_message(), "element <root> is not closed");
        assert_eq!(err.to_string(), "XML error: element <root> is not closed");
        assert_eq!(err.engine_kind(), Some(ErrorKind::Structure));
    }

    #[test]
    fn cancellation_is_not_an_engine_error() {
        assert!(ToolError::Cancelled.is_cancelled());
        assert_eq!(ToolError::Cancelled.engine_kind(), None);
        assert!(!ToolError::Config("x".into()).is_cancelled());
    }

    #[test]
    fn host_errors_convert() {
        let err: ToolError = HostError::DuplicateTool("XPathTester".into()).into();
        assert_eq!(
            err.user_message(),
            "host error: tool 'XPathTester' is already registered"
        );
    }
}
