//! Debounce and cancellation controller
//!
//! Every input change bumps a generation counter and spawns an operation.
//! Operations queue on a single-permit semaphore, so at most one parse or
//! evaluation runs at a time. An operation whose generation is no longer
//! current stops at the next checkpoint:
//!
//! 1. after acquiring the slot
//! 2. after parsing
//! 3. before evaluating
//! 4. at render, under the same lock input changes take
//!
//! Parse and evaluate bodies run on the blocking pool.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use xpt_engine::{Document, XPathEvaluator, XmlParser};

use crate::error::{ToolError, ToolResult};
use crate::format::{format_result, ResultRow};
use crate::view::ResultView;

#[derive(Debug, Default)]
struct InputState {
    /// Latest XML text
    source: String,
    /// Parsed `source`; `None` until a parse succeeds
    document: Option<Arc<Document>>,
    expression: String,
    trim: bool,
    generation: u64,
    disposed: bool,
}

/// Cancellation handle for one submitted operation
///
/// Cancelled as soon as any later input change bumps the generation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    state: Arc<Mutex<InputState>>,
}

impl CancelToken {
    /// Generation this token was issued for
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once a newer operation has been submitted
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().generation != self.generation
    }

    fn check(&self) -> ToolResult<()> {
        if self.is_cancelled() {
            Err(ToolError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Inputs captured when an operation gets the slot
struct Snapshot {
    source: String,
    document: Option<Arc<Document>>,
    expression: String,
    trim: bool,
}

enum Outcome {
    Rows(Vec<ResultRow>),
    Failed(ToolError),
}

struct Inner {
    parser: Arc<dyn XmlParser>,
    evaluator: Arc<dyn XPathEvaluator>,
    view: Arc<dyn ResultView>,
    state: Arc<Mutex<InputState>>,
    slot: Semaphore,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    runtime: Handle,
}

/// Re-parses and re-evaluates on every input change
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EvaluationController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EvaluationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EvaluationController")
            .field("generation", &state.generation)
            .field("has_document", &state.document.is_some())
            .field("expression", &state.expression)
            .field("trim", &state.trim)
            .finish_non_exhaustive()
    }
}

impl EvaluationController {
    /// Create new controller bound to the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Runtime`] when called outside a tokio runtime.
    pub fn new(
        parser: Arc<dyn XmlParser>,
        evaluator: Arc<dyn XPathEvaluator>,
        view: Arc<dyn ResultView>,
    ) -> ToolResult<Self> {
        let runtime = Handle::try_current().map_err(|e| ToolError::Runtime(e.to_string()))?;
        Ok(Self::with_runtime(parser, evaluator, view, runtime))
    }

    /// Create new controller spawning onto `runtime`
    pub fn with_runtime(
        parser: Arc<dyn XmlParser>,
        evaluator: Arc<dyn XPathEvaluator>,
        view: Arc<dyn ResultView>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                parser,
                evaluator,
                view,
                state: Arc::new(Mutex::new(InputState::default())),
                slot: Semaphore::new(1),
                tasks: Mutex::new(Vec::new()),
                runtime,
            }),
        }
    }

    /// Set the initial trim flag without starting an operation
    #[must_use]
    pub fn with_trim(self, trim: bool) -> Self {
        self.inner.state.lock().trim = trim;
        self
    }

    /// XML text changed
    ///
    /// Drops the cached document and cancels in-flight work. Blank text
    /// stops there: nothing is parsed and the display is left as is.
    pub fn on_xml_changed(&self, text: &str) {
        let token = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.source = text.to_string();
            state.document = None;
            let token = Self::bump(&mut state, &self.inner.state);
            if text.trim().is_empty() {
                tracing::debug!(generation = token.generation, "XML cleared");
                return;
            }
            token
        };
        tracing::debug!(generation = token.generation, len = text.len(), "XML changed");
        self.submit(token);
    }

    /// XPath text changed
    pub fn on_xpath_changed(&self, text: &str) {
        let token = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.expression = text.to_string();
            Self::bump(&mut state, &self.inner.state)
        };
        tracing::debug!(generation = token.generation, expression = text, "XPath changed");
        self.submit(token);
    }

    /// Trim mode toggled
    pub fn on_trim_toggled(&self, trim: bool) {
        let token = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.trim = trim;
            Self::bump(&mut state, &self.inner.state)
        };
        tracing::debug!(generation = token.generation, trim, "trim toggled");
        self.submit(token);
    }

    /// Cancel in-flight work and refuse further input
    ///
    /// Operations still waiting for the slot abort when they wake.
    pub fn dispose(&self) {
        {
            let mut state = self.inner.state.lock();
            state.disposed = true;
            state.generation += 1;
        }
        self.inner.slot.close();
        tracing::debug!("controller disposed");
    }

    /// Wait for every submitted operation to finish
    pub async fn wait_idle(&self) {
        loop {
            let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(err) = task.await {
                    tracing::error!("evaluation task failed: {}", err);
                }
            }
        }
    }

    /// Current trim flag
    #[must_use]
    pub fn trim(&self) -> bool {
        self.inner.state.lock().trim
    }

    /// Current XML text
    #[must_use]
    pub fn source(&self) -> String {
        self.inner.state.lock().source.clone()
    }

    /// Current XPath text
    #[must_use]
    pub fn expression(&self) -> String {
        self.inner.state.lock().expression.clone()
    }

    /// Last successfully parsed document for the current XML text
    #[must_use]
    pub fn document(&self) -> Option<Arc<Document>> {
        self.inner.state.lock().document.clone()
    }

    /// Current generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    fn bump(state: &mut InputState, shared: &Arc<Mutex<InputState>>) -> CancelToken {
        state.generation += 1;
        CancelToken {
            generation: state.generation,
            state: Arc::clone(shared),
        }
    }

    fn submit(&self, token: CancelToken) {
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            inner.run(token).await;
        });
        let mut tasks = self.inner.tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }
}

impl Inner {
    async fn run(&self, token: CancelToken) {
        let Ok(_permit) = self.slot.acquire().await else {
            tracing::debug!(generation = token.generation, "slot closed");
            return;
        };

        match self.execute(&token).await {
            Ok(Some(outcome)) => self.render(&token, outcome),
            Ok(None) => {}
            Err(ToolError::Cancelled) => {
                tracing::debug!(generation = token.generation, "operation superseded");
            }
            Err(err) => self.render(&token, Outcome::Failed(err)),
        }
    }

    /// Parse if needed, then evaluate; `None` leaves the display untouched
    async fn execute(&self, token: &CancelToken) -> ToolResult<Option<Outcome>> {
        let snapshot = {
            let state = self.state.lock();
            if state.generation != token.generation {
                return Err(ToolError::Cancelled);
            }
            Snapshot {
                source: state.source.clone(),
                document: state.document.clone(),
                expression: state.expression.clone(),
                trim: state.trim,
            }
        };

        let (document, parsed_now) = match snapshot.document {
            Some(document) => (document, false),
            None if snapshot.source.trim().is_empty() => return Ok(None),
            None => {
                let parser = Arc::clone(&self.parser);
                let source = snapshot.source;
                let parsed = tokio::task::spawn_blocking(move || parser.parse(&source))
                    .await
                    .map_err(|e| ToolError::Runtime(e.to_string()))?;
                let document = match parsed {
                    Ok(document) => document,
                    Err(err) => return Ok(Some(Outcome::Failed(err.into()))),
                };
                {
                    let mut state = self.state.lock();
                    if state.generation != token.generation {
                        return Err(ToolError::Cancelled);
                    }
                    state.document = Some(Arc::clone(&document));
                }
                tracing::debug!(generation = token.generation, nodes = document.len(), "parsed XML");
                (document, true)
            }
        };

        if snapshot.expression.trim().is_empty() {
            // a fresh parse clears a previous parse error
            return Ok(parsed_now.then(|| Outcome::Rows(Vec::new())));
        }

        token.check()?;
        let evaluator = Arc::clone(&self.evaluator);
        let expression = snapshot.expression;
        let trim = snapshot.trim;
        let evaluated = tokio::task::spawn_blocking(move || {
            evaluator
                .evaluate(&document, &expression)
                .map(|result| format_result(&result, trim))
        })
        .await
        .map_err(|e| ToolError::Runtime(e.to_string()))?;

        Ok(Some(match evaluated {
            Ok(rows) => Outcome::Rows(rows),
            Err(err) => Outcome::Failed(err.into()),
        }))
    }

    fn render(&self, token: &CancelToken, outcome: Outcome) {
        let state = self.state.lock();
        if state.generation != token.generation {
            tracing::debug!(generation = token.generation, "discarding superseded result");
            return;
        }
        match outcome {
            Outcome::Rows(rows) => {
                tracing::debug!(generation = token.generation, rows = rows.len(), "rendering rows");
                self.view.show_rows(rows);
            }
            Outcome::Failed(err) => {
                tracing::warn!(
                    generation = token.generation,
                    kind = ?err.engine_kind(),
                    "showing error: {}",
                    err
                );
                self.view.show_error(err.user_message());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Display, WatchView};
    use xpt_engine::{QuickXmlParser, XPath1Evaluator};

    fn controller() -> (EvaluationController, Arc<WatchView>) {
        let view = Arc::new(WatchView::new());
        let controller = EvaluationController::new(
            Arc::new(QuickXmlParser::default()),
            Arc::new(XPath1Evaluator),
            view.clone(),
        )
        .unwrap();
        (controller, view)
    }

    fn texts(display: &Display) -> Vec<String> {
        display
            .rows()
            .unwrap_or_default()
            .iter()
            .map(|r| r.text().to_string())
            .collect()
    }

    #[tokio::test]
    async fn parse_then_evaluate() {
        let (controller, view) = controller();
        controller.on_xpath_changed("//item");
        controller.on_xml_changed("<root><item>A</item><item>B</item></root>");
        controller.wait_idle().await;
        assert_eq!(texts(&view.current()), vec!["<item>A</item>", "<item>B</item>"]);
        assert!(controller.document().is_some());
    }

    #[tokio::test]
    async fn xpath_change_before_parse_completes_still_parses() {
        let (controller, view) = controller();
        controller.on_xml_changed("<root><item>A</item></root>");
        controller.on_xpath_changed("count(//item)");
        controller.wait_idle().await;
        assert_eq!(texts(&view.current()), vec!["1"]);
    }

    #[tokio::test]
    async fn tokens_cancel_on_newer_input() {
        let (controller, _view) = controller();
        let first = controller.generation();
        controller.on_xpath_changed("a");
        controller.on_xpath_changed("b");
        assert_eq!(controller.generation(), first + 2);
        controller.wait_idle().await;
    }

    #[tokio::test]
    async fn dispose_stops_everything() {
        let (controller, view) = controller();
        controller.dispose();
        controller.on_xml_changed("<a/>");
        controller.on_xpath_changed("/a");
        controller.wait_idle().await;
        assert_eq!(view.current(), Display::Empty);
    }

    #[test]
    fn requires_a_runtime() {
        let result = EvaluationController::new(
            Arc::new(QuickXmlParser::default()),
            Arc::new(XPath1Evaluator),
            Arc::new(WatchView::new()),
        );
        assert!(matches!(result, Err(ToolError::Runtime(_))));
    }
}
