//! The XPath tester tool
//!
//! [`XPathTesterTool`] wires the controller to the host-supplied settings,
//! clipboard and view, and exposes it to a [`ToolHost`](crate::host::ToolHost)
//! through [`GuiTool`].

use std::sync::Arc;

use xpt_engine::{QuickXmlParser, XPath1Evaluator};

use crate::clipboard::Clipboard;
use crate::config::ToolConfig;
use crate::controller::EvaluationController;
use crate::error::ToolResult;
use crate::format::ResultRow;
use crate::resources::{names, Resources, RESOURCE_BASE_NAME};
use crate::settings::{SettingsExt, SettingsProvider, TRIM_STYLE};
use crate::view::ResultView;

/// Data type name hosts use for XML payloads
pub const XML_DATA_TYPE: &str = "Xml";

/// Tool metadata shown by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Unique internal name
    pub name: &'static str,
    /// Menu group
    pub group: &'static str,
    pub icon_font: &'static str,
    pub icon_glyph: char,
    /// Base name of the resource table
    pub resource_base_name: &'static str,
    pub short_title_resource: &'static str,
    pub long_title_resource: &'static str,
    pub description_resource: &'static str,
    pub accessible_name_resource: &'static str,
    pub search_keywords_resource: &'static str,
}

impl ToolDescriptor {
    /// Short title in English
    #[must_use]
    pub fn short_title(&self) -> &str {
        Resources::get_or_name(self.short_title_resource)
    }

    /// Long title in English
    #[must_use]
    pub fn long_title(&self) -> &str {
        Resources::get_or_name(self.long_title_resource)
    }

    #[must_use]
    pub fn description(&self) -> &str {
        Resources::get_or_name(self.description_resource)
    }

    /// Search keywords, split on whitespace
    pub fn search_keywords(&self) -> impl Iterator<Item = &str> {
        Resources::get_or_name(self.search_keywords_resource).split_whitespace()
    }
}

/// Payload delivered with [`GuiTool::on_data_received`]
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    /// Plain text
    Text(String),
    /// Structured value
    Value(serde_json::Value),
    /// No payload
    Empty,
}

/// A tool the host can load
pub trait GuiTool: Send + Sync {
    /// Static metadata
    fn descriptor(&self) -> &ToolDescriptor;

    /// Data pushed by the host, e.g. from a clipboard detector
    ///
    /// Tools ignore data types they do not handle.
    fn on_data_received(&self, data_type: &str, payload: &DataPayload);

    /// Release resources; the tool ignores input afterwards
    fn dispose(&self);
}

/// Host capabilities handed to a tool at construction
#[derive(Clone)]
pub struct ToolContext {
    pub settings: Arc<dyn SettingsProvider>,
    pub clipboard: Arc<dyn Clipboard>,
    pub view: Arc<dyn ResultView>,
    pub config: ToolConfig,
}

impl ToolContext {
    /// Create new context with the default configuration
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        clipboard: Arc<dyn Clipboard>,
        view: Arc<dyn ResultView>,
    ) -> Self {
        Self {
            settings,
            clipboard,
            view,
            config: ToolConfig::default(),
        }
    }

    /// With configuration
    #[must_use]
    pub fn with_config(mut self, config: ToolConfig) -> Self {
        self.config = config;
        self
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

static DESCRIPTOR: ToolDescriptor = ToolDescriptor {
    name: "XPathTester",
    group: "Testers",
    icon_font: "FluentSystemIcons",
    icon_glyph: '\u{E4F4}',
    resource_base_name: RESOURCE_BASE_NAME,
    short_title_resource: names::SHORT_DISPLAY_TITLE,
    long_title_resource: names::LONG_DISPLAY_TITLE,
    description_resource: names::DESCRIPTION,
    accessible_name_resource: names::ACCESSIBLE_NAME,
    search_keywords_resource: names::SEARCH_KEYWORDS,
};

/// Evaluates an XPath expression against an XML document as either changes
pub struct XPathTesterTool {
    controller: EvaluationController,
    settings: Arc<dyn SettingsProvider>,
    clipboard: Arc<dyn Clipboard>,
}

impl std::fmt::Debug for XPathTesterTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPathTesterTool")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

impl XPathTesterTool {
    /// Create new tool on the current tokio runtime
    ///
    /// The trim flag is read from settings; an unreadable value falls back
    /// to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Runtime`](crate::ToolError::Runtime) when called
    /// outside a tokio runtime.
    pub fn new(context: ToolContext) -> ToolResult<Self> {
        let trim = context.settings.get(&TRIM_STYLE).unwrap_or_else(|err| {
            tracing::warn!("ignoring stored trim setting: {}", err);
            *TRIM_STYLE.default_value()
        });
        let controller = EvaluationController::new(
            Arc::new(QuickXmlParser::new(context.config.parse_options())),
            Arc::new(XPath1Evaluator),
            context.view,
        )?
        .with_trim(trim);
        tracing::info!("{} ready, trim={}", DESCRIPTOR.name, trim);

        Ok(Self {
            controller,
            settings: context.settings,
            clipboard: context.clipboard,
        })
    }

    /// Replace the XML input
    pub fn set_xml_text(&self, text: &str) {
        self.controller.on_xml_changed(text);
    }

    /// Current XML input
    #[must_use]
    pub fn xml_text(&self) -> String {
        self.controller.source()
    }

    /// Replace the XPath input
    pub fn set_xpath_text(&self, text: &str) {
        self.controller.on_xpath_changed(text);
    }

    #[must_use]
    pub fn xpath_text(&self) -> String {
        self.controller.expression()
    }

    /// Switch trim mode and persist it
    ///
    /// The display re-renders even if persisting fails.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Settings`](crate::ToolError::Settings) if the
    /// setting cannot be stored.
    pub fn toggle_trim(&self, trim: bool) -> ToolResult<()> {
        self.controller.on_trim_toggled(trim);
        self.settings.set(&TRIM_STYLE, &trim)?;
        Ok(())
    }

    #[must_use]
    pub fn trim(&self) -> bool {
        self.controller.trim()
    }

    /// Copy a row's text to the clipboard
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Clipboard`](crate::ToolError::Clipboard) if the
    /// clipboard rejects the write.
    pub async fn copy_row(&self, row: &ResultRow) -> ToolResult<()> {
        self.clipboard.set_text(row.copy_text()).await?;
        tracing::debug!(len = row.copy_text().len(), "copied row");
        Ok(())
    }

    /// Underlying controller
    #[inline]
    #[must_use]
    pub fn controller(&self) -> &EvaluationController {
        &self.controller
    }

    /// Wait until every pending parse and evaluation has finished
    pub async fn wait_idle(&self) {
        self.controller.wait_idle().await;
    }
}

impl GuiTool for XPathTesterTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &DESCRIPTOR
    }

    fn on_data_received(&self, data_type: &str, payload: &DataPayload) {
        match payload {
            DataPayload::Text(xml) if data_type == XML_DATA_TYPE => {
                tracing::debug!(len = xml.len(), "received XML from host");
                self.set_xml_text(xml);
            }
            _ => tracing::trace!(data_type, "ignoring received data"),
        }
    }

    fn dispose(&self) {
        self.controller.dispose();
    }
}
