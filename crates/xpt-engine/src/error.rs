//! Error types for the engine
//!
//! Provides error handling for:
//! - Malformed XML input ([`XmlError`])
//! - Invalid, unsupported or failing XPath expressions ([`XPathError`])

/// Coarse error classification, used for logging fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Lexical or grammatical error
    Syntax,
    /// Well-formedness error (nesting, roots, stray text)
    Structure,
    /// Undeclared or unresolvable namespace prefix
    Namespace,
    /// Feature outside what the engine implements
    Unsupported,
    /// Value of the wrong type for an operation
    Type,
    /// Unknown function or wrong argument count
    Function,
}

/// XML parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    /// Tokenizer rejected the input
    #[error("XML syntax error at position {position}: {message}")]
    Syntax { position: u64, message: String },

    /// Input ended inside an element
    #[error("element <{name}> is not closed")]
    UnclosedElement { name: String },

    /// End tag without a matching start tag
    #[error("unexpected end tag </{name}>")]
    UnexpectedEndTag { name: String },

    /// No element at the top level
    #[error("the document has no root element")]
    MissingRoot,

    /// A second element at the top level
    #[error("the document has more than one root element (second root is <{name}>)")]
    MultipleRoots { name: String },

    /// Character data at the top level
    #[error("data at the root level is invalid: {snippet:?}")]
    TextOutsideRoot { snippet: String },

    /// Same attribute written twice on one element
    #[error("attribute '{name}' is repeated on <{element}>")]
    DuplicateAttribute { element: String, name: String },

    /// Prefix used without an `xmlns:` declaration in scope
    #[error("namespace prefix '{prefix}' is not declared")]
    UndeclaredPrefix { prefix: String },

    /// Bytes that are not valid UTF-8
    #[error("invalid UTF-8 in {context}")]
    Encoding { context: &'static str },
}

impl XmlError {
    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } | Self::Encoding { .. } => ErrorKind::Syntax,
            Self::UndeclaredPrefix { .. } => ErrorKind::Namespace,
            Self::UnclosedElement { .. }
            | Self::UnexpectedEndTag { .. }
            | Self::MissingRoot
            | Self::MultipleRoots { .. }
            | Self::TextOutsideRoot { .. }
            | Self::DuplicateAttribute { .. } => ErrorKind::Structure,
        }
    }
}

/// XPath compile and evaluation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    /// Blank expression
    #[error("the XPath expression is empty")]
    Empty,

    /// Lexer or parser rejected the expression
    #[error("XPath syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Call to a function outside the core library
    #[error("'{name}()' is not a known function")]
    UnknownFunction { name: String },

    /// Wrong number of arguments for a core function
    #[error("'{name}()' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    /// Grammar accepted but not implemented
    #[error("{feature} is not supported")]
    Unsupported { feature: String },

    /// Prefix in a name test with no declaration on the document element
    #[error("namespace prefix '{prefix}' is not defined")]
    UndefinedPrefix { prefix: String },

    /// Variable reference; no bindings are ever supplied
    #[error("variable ${name} is not bound")]
    UnboundVariable { name: String },

    /// Operation that needs a node-set received another value type
    #[error("{context} requires a node-set")]
    NodeSetExpected { context: String },
}

impl XPathError {
    /// Create syntax error
    #[inline]
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create node-set expectation error
    #[inline]
    pub fn node_set_expected(context: impl Into<String>) -> Self {
        Self::NodeSetExpected {
            context: context.into(),
        }
    }

    /// Classify this error
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty | Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UnknownFunction { .. } | Self::Arity { .. } => ErrorKind::Function,
            Self::Unsupported { .. } | Self::UnboundVariable { .. } => ErrorKind::Unsupported,
            Self::UndefinedPrefix { .. } => ErrorKind::Namespace,
            Self::NodeSetExpected { .. } => ErrorKind::Type,
        }
    }

    /// True if the error was detected while compiling rather than evaluating
    #[inline]
    #[must_use]
    pub fn is_compile_time(&self) -> bool {
        matches!(
            self,
            Self::Empty
                | Self::Syntax { .. }
                | Self::UnknownFunction { .. }
                | Self::Arity { .. }
                | Self::Unsupported { .. }
        )
    }
}
