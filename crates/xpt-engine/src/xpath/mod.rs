//! XPath 1.0
//!
//! Expressions are compiled once into a tree and can then be evaluated any
//! number of times. The context node is always the document root.
//!
//! ```rust,ignore
//! let doc = parse_document("<r><i>1</i><i>2</i></r>", ParseOptions::default())?;
//! let xpath = XPath::compile("sum(//i)")?;
//! assert_eq!(xpath.evaluate(&doc)?, Value::Number(3.0));
//! ```

mod ast;
mod eval;
mod functions;
mod lexer;
mod parser;
mod value;

pub use value::{format_number, parse_number, Value};

use std::fmt;

use crate::document::Document;
use crate::error::XPathError;

/// A compiled XPath expression
#[derive(Clone)]
pub struct XPath {
    source: String,
    expr: ast::Expr,
}

impl XPath {
    /// Compile an expression
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] for blank input, syntax errors, unknown
    /// functions, wrong argument counts and unsupported axes.
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Source text the expression was compiled from
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `doc` with the root as context node
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] for runtime faults: unbound variables,
    /// undefined prefixes and non-node-set operands where a node-set is
    /// required.
    pub fn evaluate(&self, doc: &Document) -> Result<Value, XPathError> {
        eval::Evaluator::new(doc).evaluate(&self.expr, eval::Context::root())
    }
}

impl fmt::Debug for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPath").field(&self.source).finish()
    }
}
