//! XPT Engine - XML documents and XPath 1.0
//!
//! Provides:
//! - An arena document model with document-ordered node ids
//! - A quick-xml based parser with namespace resolution
//! - Serialization of nodes to indented XML text
//! - A complete XPath 1.0 compiler and evaluator
//! - The [`XmlParser`] / [`XPathEvaluator`] capability traits
//!
//! # Example
//!
//! ```rust,ignore
//! use xpt_engine::prelude::*;
//!
//! let doc = QuickXmlParser::default().parse("<root><item>A</item><item>B</item></root>")?;
//! let result = XPath1Evaluator.evaluate(&doc, "//item")?;
//! for item in result.items() {
//!     println!("{item}");
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod document;
pub mod engine;
pub mod error;
pub mod parser;
pub mod serialize;
pub mod xpath;

pub use document::{Document, NamespaceDecl, Node, NodeId, NodeKind, QName, XML_NAMESPACE};
pub use engine::{
    EvaluationResult, Item, NodeHandle, QuickXmlParser, Scalar, XPath1Evaluator, XPathEvaluator,
    XmlParser,
};
pub use error::{ErrorKind, XPathError, XmlError};
pub use parser::{parse_document, ParseOptions};
pub use serialize::to_xml_string;
pub use xpath::{Value, XPath};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        Document, EvaluationResult, Item, NodeId, ParseOptions, QuickXmlParser, Scalar,
        XPath1Evaluator, XPathError, XPathEvaluator, XmlError, XmlParser,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
