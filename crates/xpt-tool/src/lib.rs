//! XPT Tool - interactive XPath tester
//!
//! Re-parses the XML input and re-evaluates the XPath expression after
//! every edit:
//! - Only the newest edit is evaluated; superseded work is cancelled
//! - Results render as copyable rows, optionally trimmed
//! - Parse and evaluation failures render as an error message
//! - The trim flag persists through the host's settings store
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xpt_tool::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let view = Arc::new(WatchView::new());
//! let context = ToolContext::new(
//!     Arc::new(InMemorySettings::new()),
//!     Arc::new(InMemoryClipboard::new()),
//!     view.clone(),
//! );
//! let tool = XPathTesterTool::new(context)?;
//!
//! tool.set_xml_text("<root><item>A</item><item>B</item></root>");
//! tool.set_xpath_text("count(//item)");
//! tool.wait_idle().await;
//!
//! println!("{:?}", view.current());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod clipboard;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod host;
pub mod logging;
pub mod resources;
pub mod settings;
pub mod tool;
pub mod view;

pub use clipboard::{Clipboard, InMemoryClipboard};
pub use config::{LogFormat, LoggingConfig, ParseConfig, ToolConfig};
pub use controller::{CancelToken, EvaluationController};
pub use error::{ClipboardError, HostError, SettingsError, ToolError, ToolResult};
pub use format::{format_result, format_texts, trim_text, ResultRow};
pub use host::ToolHost;
pub use resources::Resources;
pub use settings::{
    FileSettings, InMemorySettings, SettingDefinition, SettingsExt, SettingsProvider, TRIM_STYLE,
};
pub use tool::{DataPayload, GuiTool, ToolContext, ToolDescriptor, XPathTesterTool, XML_DATA_TYPE};
pub use view::{Display, ResultView, WatchView};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosting the tool
    pub use crate::{
        Clipboard, DataPayload, Display, EvaluationController, GuiTool, InMemoryClipboard,
        InMemorySettings, ResultRow, ResultView, SettingsExt, SettingsProvider, ToolConfig,
        ToolContext, ToolError, ToolHost, ToolResult, WatchView, XPathTesterTool,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
