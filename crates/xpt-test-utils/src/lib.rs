//! Testing utilities for XPT workspace
//!
//! Shared fixtures, test doubles and helpers.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use xpt_engine::{
    Document, EvaluationResult, ParseOptions, QuickXmlParser, XPath1Evaluator, XPathError,
    XPathEvaluator, XmlError, XmlParser,
};
use xpt_tool::{
    Clipboard, ClipboardError, Display, EvaluationController, InMemoryClipboard,
    InMemorySettings, ResultRow, ResultView, SettingsProvider, ToolContext,
};

pub const ITEMS_XML: &str = "<root><item>A</item><item>B</item></root>";

pub const SPACED_XML: &str = "<root>\n  <item>\n    A\n  </item>\n  <item>  B  </item>\n</root>";

pub const CATALOG_XML: &str = r#"<?xml version="1.0"?>
<catalog xmlns:bk="urn:books">
  <bk:book id="b1" year="1999"><title>Dune</title><price>9.5</price></bk:book>
  <bk:book id="b2" year="2005"><title>Anathem</title><price>12</price></bk:book>
  <magazine id="m1"><title>Wired</title></magazine>
</catalog>"#;

pub const MALFORMED_XML: &str = "<root><item>A</item>";

/// View that records every render
#[derive(Debug, Default)]
pub struct RecordingView {
    history: Mutex<Vec<Display>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Display> {
        self.history.lock().clone()
    }

    /// Last render, or [`Display::Empty`] if nothing rendered
    pub fn current(&self) -> Display {
        self.history.lock().last().cloned().unwrap_or_default()
    }

    pub fn renders(&self) -> usize {
        self.history.lock().len()
    }

    /// Row texts of the last render
    pub fn texts(&self) -> Vec<String> {
        texts(&self.current())
    }
}

impl ResultView for RecordingView {
    fn show_rows(&self, rows: Vec<ResultRow>) {
        self.history.lock().push(Display::Rows(rows));
    }

    fn show_error(&self, message: String) {
        self.history.lock().push(Display::Error(message));
    }
}

/// Row texts shown by `display`; empty unless it shows rows
pub fn texts(display: &Display) -> Vec<String> {
    display
        .rows()
        .unwrap_or_default()
        .iter()
        .map(|row| row.text().to_string())
        .collect()
}

/// Parser that blocks every parse until released
///
/// Counts parses so tests can assert none happened.
#[derive(Debug)]
pub struct GatedParser {
    inner: QuickXmlParser,
    open: Mutex<bool>,
    opened: Condvar,
    entered: Notify,
    parses: AtomicUsize,
}

impl Default for GatedParser {
    fn default() -> Self {
        Self::closed()
    }
}

impl GatedParser {
    /// Parser that waits for [`release`](Self::release)
    pub fn closed() -> Self {
        Self::with_state(false)
    }

    /// Parser that never blocks
    pub fn open() -> Self {
        Self::with_state(true)
    }

    fn with_state(open: bool) -> Self {
        Self {
            inner: QuickXmlParser::new(ParseOptions::default()),
            open: Mutex::new(open),
            opened: Condvar::new(),
            entered: Notify::new(),
            parses: AtomicUsize::new(0),
        }
    }

    /// Let every current and future parse through
    pub fn release(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    /// Wait until a parse has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}

impl XmlParser for GatedParser {
    fn parse(&self, text: &str) -> Result<Arc<Document>, XmlError> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
        drop(open);
        self.inner.parse(text)
    }
}

/// Evaluator that always fails
#[derive(Debug, Clone)]
pub struct FailingEvaluator {
    feature: String,
}

impl FailingEvaluator {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
        }
    }
}

impl XPathEvaluator for FailingEvaluator {
    fn evaluate(
        &self,
        _document: &Arc<Document>,
        _expression: &str,
    ) -> Result<EvaluationResult, XPathError> {
        Err(XPathError::Unsupported {
            feature: self.feature.clone(),
        })
    }
}

/// Evaluator that sleeps before delegating to [`XPath1Evaluator`]
#[derive(Debug, Clone)]
pub struct SlowEvaluator {
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl SlowEvaluator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl XPathEvaluator for SlowEvaluator {
    fn evaluate(
        &self,
        document: &Arc<Document>,
        expression: &str,
    ) -> Result<EvaluationResult, XPathError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        XPath1Evaluator.evaluate(document, expression)
    }
}

/// Counts parse and evaluate bodies running at once and keeps the peak
#[derive(Debug, Default)]
pub struct ConcurrencyTracker {
    active: AtomicUsize,
    peak: AtomicUsize,
    entries: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `body` after holding the tracker busy for `delay`
    fn track<T>(&self, delay: Duration, body: impl FnOnce() -> T) -> T {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.entries.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(delay);
        let result = body();
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    /// Most bodies ever seen running together
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn entries(&self) -> usize {
        self.entries.load(Ordering::SeqCst)
    }
}

/// Parser reporting to a [`ConcurrencyTracker`]
#[derive(Debug)]
pub struct TrackingParser {
    tracker: Arc<ConcurrencyTracker>,
    delay: Duration,
    parses: AtomicUsize,
}

impl TrackingParser {
    pub fn new(tracker: Arc<ConcurrencyTracker>, delay: Duration) -> Self {
        Self {
            tracker,
            delay,
            parses: AtomicUsize::new(0),
        }
    }

    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }
}

impl XmlParser for TrackingParser {
    fn parse(&self, text: &str) -> Result<Arc<Document>, XmlError> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        self.tracker
            .track(self.delay, || QuickXmlParser::default().parse(text))
    }
}

/// Evaluator reporting to a [`ConcurrencyTracker`]
#[derive(Debug)]
pub struct TrackingEvaluator {
    tracker: Arc<ConcurrencyTracker>,
    delay: Duration,
    calls: AtomicUsize,
}

impl TrackingEvaluator {
    pub fn new(tracker: Arc<ConcurrencyTracker>, delay: Duration) -> Self {
        Self {
            tracker,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl XPathEvaluator for TrackingEvaluator {
    fn evaluate(
        &self,
        document: &Arc<Document>,
        expression: &str,
    ) -> Result<EvaluationResult, XPathError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tracker
            .track(self.delay, || XPath1Evaluator.evaluate(document, expression))
    }
}

/// Clipboard that rejects every write
#[derive(Debug, Default)]
pub struct FailingClipboard;

#[async_trait]
impl Clipboard for FailingClipboard {
    async fn set_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unavailable("clipboard locked".to_string()))
    }
}

/// Controller over the real engine rendering into a [`RecordingView`]
pub fn setup_controller() -> (EvaluationController, Arc<RecordingView>) {
    setup_controller_with(
        Arc::new(QuickXmlParser::default()),
        Arc::new(XPath1Evaluator),
    )
}

pub fn setup_controller_with(
    parser: Arc<dyn XmlParser>,
    evaluator: Arc<dyn XPathEvaluator>,
) -> (EvaluationController, Arc<RecordingView>) {
    let view = Arc::new(RecordingView::new());
    let controller = EvaluationController::new(parser, evaluator, view.clone()).unwrap();
    (controller, view)
}

/// Capabilities for building a tool, with handles to inspect them
pub struct TestContext {
    pub context: ToolContext,
    pub view: Arc<RecordingView>,
    pub clipboard: Arc<InMemoryClipboard>,
}

pub fn setup_context() -> TestContext {
    setup_context_with(Arc::new(InMemorySettings::new()))
}

pub fn setup_context_with(settings: Arc<dyn SettingsProvider>) -> TestContext {
    let view = Arc::new(RecordingView::new());
    let clipboard = Arc::new(InMemoryClipboard::new());
    let context = ToolContext::new(settings, clipboard.clone(), view.clone());
    TestContext {
        context,
        view,
        clipboard,
    }
}
