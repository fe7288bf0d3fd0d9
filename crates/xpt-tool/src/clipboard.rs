//! Clipboard capability

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ClipboardError;

/// System clipboard, supplied by the host
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl InMemoryClipboard {
    /// Create new empty clipboard
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    #[must_use]
    pub fn text(&self) -> Option<String> {
        self.contents.lock().clone()
    }
}

#[async_trait]
impl Clipboard for InMemoryClipboard {
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.contents.lock() = Some(text.to_string());
        Ok(())
    }
}
