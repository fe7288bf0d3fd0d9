//! Tool and host integration tests

use std::sync::Arc;

use pretty_assertions::assert_eq;
use xpt_test_utils::{setup_context, setup_context_with, FailingClipboard, ITEMS_XML, SPACED_XML};
use xpt_tool::{
    DataPayload, GuiTool, HostError, InMemorySettings, SettingsExt, SettingsProvider, ToolConfig,
    ToolContext, ToolError, ToolHost, XPathTesterTool, TRIM_STYLE, XML_DATA_TYPE,
};

#[tokio::test]
async fn trim_is_read_at_startup() {
    let settings = Arc::new(InMemorySettings::new());
    settings.set(&TRIM_STYLE, &true).unwrap();
    let test = setup_context_with(settings);
    let tool = XPathTesterTool::new(test.context).unwrap();
    assert!(tool.trim());

    tool.set_xml_text(SPACED_XML);
    tool.set_xpath_text("//item/text()");
    tool.wait_idle().await;
    assert_eq!(test.view.texts(), vec!["A", "B"]);
}

#[tokio::test]
async fn unreadable_trim_setting_falls_back_to_default() {
    let settings = Arc::new(InMemorySettings::new());
    settings
        .set_value(TRIM_STYLE.name(), serde_json::json!("sometimes"))
        .unwrap();
    let tool = XPathTesterTool::new(setup_context_with(settings).context).unwrap();
    assert!(!tool.trim());
}

#[tokio::test]
async fn toggling_trim_persists_it() {
    let settings = Arc::new(InMemorySettings::new());
    let test = setup_context_with(settings.clone());
    let tool = XPathTesterTool::new(test.context).unwrap();

    tool.set_xml_text(SPACED_XML);
    tool.set_xpath_text("//item/text()");
    tool.toggle_trim(true).unwrap();
    tool.wait_idle().await;

    assert!(settings.get(&TRIM_STYLE).unwrap());
    assert_eq!(test.view.texts(), vec!["A", "B"]);
}

#[tokio::test]
async fn copy_places_displayed_text_on_clipboard() {
    let test = setup_context();
    let tool = XPathTesterTool::new(test.context).unwrap();
    tool.toggle_trim(true).unwrap();
    tool.set_xml_text(SPACED_XML);
    tool.set_xpath_text("//item/text()");
    tool.wait_idle().await;

    let current = test.view.current();
    let rows = current.rows().unwrap();
    tool.copy_row(&rows[1]).await.unwrap();
    assert_eq!(test.clipboard.text().as_deref(), Some("B"));
}

#[tokio::test]
async fn clipboard_failures_surface() {
    let test = setup_context();
    let context = ToolContext::new(
        test.context.settings.clone(),
        Arc::new(FailingClipboard),
        test.view.clone(),
    );
    let tool = XPathTesterTool::new(context).unwrap();
    let err = tool.copy_row(&xpt_tool::ResultRow::new("x")).await.unwrap_err();
    assert!(matches!(err, ToolError::Clipboard(_)));
}

#[tokio::test]
async fn xml_data_drives_a_reparse() {
    let test = setup_context();
    let tool = XPathTesterTool::new(test.context).unwrap();
    tool.set_xpath_text("count(//item)");

    tool.on_data_received("Json", &DataPayload::Text("<root><item/></root>".into()));
    tool.on_data_received(XML_DATA_TYPE, &DataPayload::Value(serde_json::json!({"a": 1})));
    tool.wait_idle().await;
    assert_eq!(test.view.renders(), 0);

    tool.on_data_received(XML_DATA_TYPE, &DataPayload::Text(ITEMS_XML.into()));
    tool.wait_idle().await;
    assert_eq!(tool.xml_text(), ITEMS_XML);
    assert_eq!(test.view.texts(), vec!["2"]);
}

#[tokio::test]
async fn config_reaches_the_parser() {
    let test = setup_context();
    let context = test
        .context
        .with_config(ToolConfig::new().with_preserve_whitespace(true));
    let tool = XPathTesterTool::new(context).unwrap();
    tool.set_xml_text("<root>\n  <item/>\n</root>");
    tool.set_xpath_text("count(/root/text())");
    tool.wait_idle().await;
    assert_eq!(test.view.texts(), vec!["2"]);
}

#[tokio::test]
async fn host_rejects_duplicates_and_broadcasts() {
    let host = ToolHost::new();
    let test = setup_context();
    let tool = Arc::new(XPathTesterTool::new(test.context.clone()).unwrap());
    host.register(tool.clone()).unwrap();

    let again = Arc::new(XPathTesterTool::new(test.context).unwrap());
    assert!(matches!(
        host.register(again),
        Err(HostError::DuplicateTool(name)) if name == "XPathTester"
    ));

    let registered = host.get("XPathTester").unwrap();
    assert_eq!(registered.descriptor().group, "Testers");

    tool.set_xpath_text("//item[1]");
    host.deliver_data(XML_DATA_TYPE, &DataPayload::Text(ITEMS_XML.into()));
    tool.wait_idle().await;
    assert_eq!(test.view.texts(), vec!["<item>A</item>"]);

    host.shutdown();
    assert!(host.is_empty());
    tool.set_xml_text("<other/>");
    tool.wait_idle().await;
    assert_eq!(test.view.texts(), vec!["<item>A</item>"]);
}

#[test]
fn tool_needs_a_runtime() {
    let test = setup_context();
    assert!(matches!(
        XPathTesterTool::new(test.context),
        Err(ToolError::Runtime(_))
    ));
}
