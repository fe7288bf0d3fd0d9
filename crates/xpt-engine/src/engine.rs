//! Swappable parse and evaluate capabilities
//!
//! The tool only sees [`XmlParser`] and [`XPathEvaluator`]; the default
//! implementations wrap [`parse_document`] and [`XPath`].

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::document::{Document, NodeId};
use crate::error::{XPathError, XmlError};
use crate::parser::{parse_document, ParseOptions};
use crate::xpath::{format_number, Value, XPath};

/// Turns XML text into a document
pub trait XmlParser: Send + Sync {
    /// Parse `text`
    ///
    /// # Errors
    ///
    /// Returns [`XmlError`] on malformed input.
    fn parse(&self, text: &str) -> Result<Arc<Document>, XmlError>;
}

/// Evaluates an expression against a document
pub trait XPathEvaluator: Send + Sync {
    /// Evaluate `expression` with the document root as context
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] for invalid, unsupported or failing expressions.
    fn evaluate(
        &self,
        document: &Arc<Document>,
        expression: &str,
    ) -> Result<EvaluationResult, XPathError>;
}

/// [`XmlParser`] backed by quick-xml
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlParser {
    options: ParseOptions,
}

impl QuickXmlParser {
    /// Create new parser
    #[inline]
    #[must_use]
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> ParseOptions {
        self.options
    }
}

impl XmlParser for QuickXmlParser {
    fn parse(&self, text: &str) -> Result<Arc<Document>, XmlError> {
        let doc = parse_document(text, self.options)?;
        trace!(nodes = doc.len(), "parsed document");
        Ok(Arc::new(doc))
    }
}

/// [`XPathEvaluator`] implementing XPath 1.0
#[derive(Debug, Clone, Copy, Default)]
pub struct XPath1Evaluator;

impl XPathEvaluator for XPath1Evaluator {
    fn evaluate(
        &self,
        document: &Arc<Document>,
        expression: &str,
    ) -> Result<EvaluationResult, XPathError> {
        let xpath = XPath::compile(expression)?;
        let result = match xpath.evaluate(document)? {
            Value::NodeSet(nodes) => EvaluationResult::Sequence(
                nodes
                    .into_iter()
                    .map(|id| Item::Node(NodeHandle::new(Arc::clone(document), id)))
                    .collect(),
            ),
            Value::Boolean(b) => EvaluationResult::Scalar(Scalar::Boolean(b)),
            Value::Number(n) => EvaluationResult::Scalar(Scalar::Number(n)),
            Value::String(s) => EvaluationResult::Scalar(Scalar::String(s)),
        };
        trace!(expression, items = result.len(), "evaluated expression");
        Ok(result)
    }
}

/// Atomic result value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    String(String),
    Boolean(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A node that keeps its document alive
#[derive(Clone)]
pub struct NodeHandle {
    document: Arc<Document>,
    id: NodeId,
}

impl NodeHandle {
    /// Create new handle
    #[inline]
    #[must_use]
    pub fn new(document: Arc<Document>, id: NodeId) -> Self {
        Self { document, id }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    /// XPath string-value of the node
    #[must_use]
    pub fn string_value(&self) -> String {
        self.document.string_value(self.id)
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.document.node(self.id).to_xml())
    }
}

impl fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("kind", self.document.kind(self.id))
            .finish()
    }
}

/// One entry of a result sequence
#[derive(Debug, Clone)]
pub enum Item {
    Node(NodeHandle),
    Scalar(Scalar),
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => fmt::Display::fmt(node, f),
            Self::Scalar(scalar) => fmt::Display::fmt(scalar, f),
        }
    }
}

/// Outcome of an evaluation
#[derive(Debug, Clone)]
pub enum EvaluationResult {
    /// Single number, string or boolean
    Scalar(Scalar),
    /// Ordered items, e.g. matched nodes in document order
    Sequence(Vec<Item>),
}

impl EvaluationResult {
    /// Items in result order; a scalar is a one-item sequence
    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        match self {
            Self::Scalar(scalar) => vec![Item::Scalar(scalar.clone())],
            Self::Sequence(items) => items.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Sequence(items) => items.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate(xml: &str, expression: &str) -> Result<EvaluationResult, XPathError> {
        let doc = QuickXmlParser::default().parse(xml).unwrap();
        XPath1Evaluator.evaluate(&doc, expression)
    }

    #[test]
    fn node_sets_become_sequences() {
        let result = evaluate("<root><item>A</item><item>B</item></root>", "//item").unwrap();
        let texts: Vec<String> = result.items().iter().map(ToString::to_string).collect();
        assert_eq!(texts, vec!["<item>A</item>", "<item>B</item>"]);
    }

    #[test]
    fn scalars_display_like_xpath_strings() {
        let xml = "<root><item>A</item><item>B</item></root>";
        let count = evaluate(xml, "count(//item)").unwrap();
        assert_eq!(count.len(), 1);
        assert_eq!(count.items()[0].to_string(), "2");
        assert_eq!(evaluate(xml, "1 div 0").unwrap().items()[0].to_string(), "Infinity");
        assert_eq!(evaluate(xml, "1 = 1").unwrap().items()[0].to_string(), "true");
        assert_eq!(evaluate(xml, "'x'").unwrap().items()[0].to_string(), "x");
    }

    #[test]
    fn handles_keep_the_document_alive() {
        let result = evaluate("<a><b/></a>", "/a/b").unwrap();
        let EvaluationResult::Sequence(items) = result else {
            panic!("expected a sequence");
        };
        let Item::Node(handle) = &items[0] else {
            panic!("expected a node");
        };
        assert_eq!(handle.to_string(), "<b />");
        assert_eq!(Arc::strong_count(handle.document()), 1);
    }

    #[test]
    fn errors_pass_through() {
        assert!(matches!(
            evaluate("<a/>", "count('x')").unwrap_err(),
            XPathError::NodeSetExpected { .. }
        ));
        assert_eq!(evaluate("<a/>", "").unwrap_err(), XPathError::Empty);
    }
}
