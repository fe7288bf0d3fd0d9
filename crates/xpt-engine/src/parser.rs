//! XML text to [`Document`]
//!
//! Drives the `quick-xml` event reader and builds the arena document,
//! resolving namespace prefixes as elements open.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::trace;

use crate::document::{Document, NamespaceDecl, NodeId, NodeKind, QName, XML_NAMESPACE};
use crate::error::XmlError;

/// Parser options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep text nodes that contain only whitespace
    pub preserve_whitespace: bool,
}

impl ParseOptions {
    /// Set whitespace preservation
    #[inline]
    #[must_use]
    pub fn with_preserve_whitespace(mut self, preserve: bool) -> Self {
        self.preserve_whitespace = preserve;
        self
    }
}

/// Parse `text` into a document
///
/// # Errors
///
/// Returns [`XmlError`] if the input is not a well-formed XML document.
pub fn parse_document(text: &str, options: ParseOptions) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = false;

    let mut builder = TreeBuilder::new(options);
    loop {
        let event = reader
            .read_event()
            .map_err(|err| syntax_error(reader.error_position(), &err))?;
        match event {
            Event::Start(start) => builder.open(&start, false, reader.buffer_position())?,
            Event::Empty(start) => builder.open(&start, true, reader.buffer_position())?,
            Event::End(end) => builder.close(utf8(end.name().as_ref(), "end tag")?)?,
            Event::Text(text) => {
                let content = text
                    .unescape()
                    .map_err(|err| syntax_error(reader.buffer_position(), &err))?;
                builder.text(&content, false)?;
            }
            Event::CData(cdata) => builder.text(utf8(&cdata, "CDATA section")?, true)?,
            Event::Comment(comment) => {
                builder.leaf(NodeKind::Comment(utf8(&comment, "comment")?.to_string()));
            }
            Event::PI(pi) => {
                let target = utf8(pi.target(), "processing instruction")?.to_string();
                let data = utf8(pi.content(), "processing instruction")?
                    .trim_start()
                    .to_string();
                builder.leaf(NodeKind::ProcessingInstruction { target, data });
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }
    builder.finish()
}

fn position<T: TryInto<u64>>(position: T) -> u64 {
    position.try_into().unwrap_or(u64::MAX)
}

fn syntax_error<T: TryInto<u64>>(at: T, err: &dyn std::fmt::Display) -> XmlError {
    XmlError::Syntax {
        position: position(at),
        message: err.to_string(),
    }
}

fn utf8<'b>(bytes: &'b [u8], context: &'static str) -> Result<&'b str, XmlError> {
    std::str::from_utf8(bytes).map_err(|_| XmlError::Encoding { context })
}

fn split_qname(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    }
}

struct OpenElement {
    id: NodeId,
    raw_name: String,
    scope_len: usize,
}

/// Character data collected until the next markup event
struct PendingText {
    content: String,
    all_cdata: bool,
    any_cdata: bool,
}

struct TreeBuilder {
    doc: Document,
    options: ParseOptions,
    open: Vec<OpenElement>,
    pending: Option<PendingText>,
    /// (prefix, uri) bindings, innermost last
    scope: Vec<(Option<String>, String)>,
    has_root: bool,
}

impl TreeBuilder {
    fn new(options: ParseOptions) -> Self {
        Self {
            doc: Document::new(),
            options,
            open: Vec::new(),
            pending: None,
            scope: Vec::new(),
            has_root: false,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().map_or(NodeId::ROOT, |e| e.id)
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        self.scope
            .iter()
            .rev()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn resolve_element(&self, raw: &str) -> Result<QName, XmlError> {
        let (prefix, local) = split_qname(raw);
        let namespace = self.lookup(prefix);
        if let (Some(prefix), None) = (prefix, namespace) {
            return Err(XmlError::UndeclaredPrefix {
                prefix: prefix.to_string(),
            });
        }
        Ok(QName::new(prefix, local, namespace))
    }

    fn resolve_attribute(&self, raw: &str) -> Result<QName, XmlError> {
        match split_qname(raw) {
            (None, local) => Ok(QName::local(local)),
            (Some(prefix), local) => {
                let namespace = self.lookup(Some(prefix)).ok_or_else(|| {
                    XmlError::UndeclaredPrefix {
                        prefix: prefix.to_string(),
                    }
                })?;
                Ok(QName::new(Some(prefix), local, Some(namespace)))
            }
        }
    }

    fn open<P: TryInto<u64> + Copy>(
        &mut self,
        start: &BytesStart<'_>,
        empty: bool,
        at: P,
    ) -> Result<(), XmlError> {
        self.flush_text();
        let raw_name = utf8(start.name().as_ref(), "element name")?.to_string();
        if self.open.is_empty() {
            if self.has_root {
                return Err(XmlError::MultipleRoots { name: raw_name });
            }
            self.has_root = true;
        }

        let mut raw_attributes: Vec<(String, String)> = Vec::new();
        for attr in start.attributes().with_checks(false) {
            let attr = attr.map_err(|err| syntax_error(at, &err))?;
            let key = utf8(attr.key.as_ref(), "attribute name")?.to_string();
            if raw_attributes.iter().any(|(k, _)| *k == key) {
                return Err(XmlError::DuplicateAttribute {
                    element: raw_name,
                    name: key,
                });
            }
            let value = attr
                .unescape_value()
                .map_err(|err| syntax_error(at, &err))?
                .into_owned();
            raw_attributes.push((key, value));
        }

        let scope_len = self.scope.len();
        let mut namespaces = Vec::new();
        let mut attributes = Vec::new();
        for (key, value) in raw_attributes {
            let prefix = match key.as_str() {
                "xmlns" => None,
                other => match other.strip_prefix("xmlns:") {
                    Some(prefix) => Some(prefix.to_string()),
                    None => {
                        attributes.push((key, value));
                        continue;
                    }
                },
            };
            self.scope.push((prefix.clone(), value.clone()));
            namespaces.push(NamespaceDecl { prefix, uri: value });
        }

        let name = self.resolve_element(&raw_name)?;
        let parent = self.current();
        let id = self
            .doc
            .append_child(parent, NodeKind::Element { name, namespaces });
        for (key, value) in attributes {
            let name = self.resolve_attribute(&key)?;
            self.doc.append_attribute(id, name, value);
        }
        trace!(element = %raw_name, node = id.index(), "opened element");

        if empty {
            self.scope.truncate(scope_len);
        } else {
            self.open.push(OpenElement {
                id,
                raw_name,
                scope_len,
            });
        }
        Ok(())
    }

    fn close(&mut self, raw_name: &str) -> Result<(), XmlError> {
        self.flush_text();
        match self.open.pop() {
            Some(element) if element.raw_name == raw_name => {
                self.scope.truncate(element.scope_len);
                Ok(())
            }
            _ => Err(XmlError::UnexpectedEndTag {
                name: raw_name.to_string(),
            }),
        }
    }

    /// Adjacent text and CDATA sections become one text node
    fn text(&mut self, content: &str, cdata: bool) -> Result<(), XmlError> {
        if self.open.is_empty() {
            if content.chars().all(char::is_whitespace) && !cdata {
                return Ok(());
            }
            let snippet: String = content.trim().chars().take(32).collect();
            return Err(XmlError::TextOutsideRoot { snippet });
        }
        match &mut self.pending {
            Some(pending) => {
                pending.content.push_str(content);
                pending.all_cdata &= cdata;
                pending.any_cdata |= cdata;
            }
            None => {
                self.pending = Some(PendingText {
                    content: content.to_string(),
                    all_cdata: cdata,
                    any_cdata: cdata,
                });
            }
        }
        Ok(())
    }

    fn flush_text(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let blank = pending.content.chars().all(char::is_whitespace);
        if blank && !pending.any_cdata && !self.options.preserve_whitespace {
            return;
        }
        let parent = self.current();
        self.doc.append_child(
            parent,
            NodeKind::Text {
                content: pending.content,
                cdata: pending.all_cdata,
            },
        );
    }

    fn leaf(&mut self, kind: NodeKind) {
        self.flush_text();
        let parent = self.current();
        self.doc.append_child(parent, kind);
    }

    fn finish(self) -> Result<Document, XmlError> {
        if let Some(element) = self.open.last() {
            return Err(XmlError::UnclosedElement {
                name: element.raw_name.clone(),
            });
        }
        if !self.has_root {
            return Err(XmlError::MissingRoot);
        }
        Ok(self.doc)
    }
}
