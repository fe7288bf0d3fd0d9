//! Arena-backed XML document
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Nodes are
//! appended in document order (an element, then its attributes, then its
//! descendants), so comparing ids compares document position.
//!
//! A built [`Document`] is immutable and `Send + Sync`; callers share it as
//! `Arc<Document>`.

use std::fmt;

/// Namespace bound to the `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Index of a node within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// The document root node
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Qualified name with its resolved namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    prefix: Option<String>,
    local: String,
    namespace: Option<String>,
}

impl QName {
    /// Create a name
    #[inline]
    pub fn new(
        prefix: Option<impl Into<String>>,
        local: impl Into<String>,
        namespace: Option<impl Into<String>>,
    ) -> Self {
        Self {
            prefix: prefix.map(Into::into),
            local: local.into(),
            namespace: namespace.map(Into::into),
        }
    }

    /// Name with no prefix and no namespace
    #[inline]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            namespace: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    #[inline]
    #[must_use]
    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// `xmlns` / `xmlns:prefix` declaration carried by an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` for the default namespace
    pub prefix: Option<String>,
    /// Empty string undeclares the default namespace
    pub uri: String,
}

/// Node payload
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Document node, parent of the document element
    Root,
    /// Element with the namespace declarations written on it
    Element {
        name: QName,
        namespaces: Vec<NamespaceDecl>,
    },
    /// Attribute (never a namespace declaration)
    Attribute { name: QName, value: String },
    /// Character data; `cdata` marks a CDATA section
    Text { content: String, cdata: bool },
    /// Comment body
    Comment(String),
    /// Processing instruction
    ProcessingInstruction { target: String, data: String },
}

impl NodeKind {
    #[inline]
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root node
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
                attributes: Vec::new(),
            }],
        }
    }

    /// Append a child node under `parent`
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push(kind, parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an attribute node to `owner`
    ///
    /// Attributes must be appended before any child of `owner` to keep
    /// arena order equal to document order.
    pub fn append_attribute(&mut self, owner: NodeId, name: QName, value: String) -> NodeId {
        let id = self.push(NodeKind::Attribute { name, value }, owner);
        self.nodes[owner.0].attributes.push(id);
        id
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            attributes: Vec::new(),
        });
        id
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The single top-level element, if any
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(NodeId::ROOT)
            .iter()
            .copied()
            .find(|&id| self.kind(id).is_element())
    }

    /// Number of nodes, root and attributes included
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the document holds nothing but the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Look up a node id by arena index
    #[inline]
    #[must_use]
    pub fn node_id(&self, index: usize) -> Option<NodeId> {
        (index < self.nodes.len()).then_some(NodeId(index))
    }

    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Parent node; the owner element for attributes
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[inline]
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].attributes
    }

    /// Element or attribute name
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        match self.kind(id) {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Value of the attribute with the given local name and no namespace
    #[must_use]
    pub fn attribute_value(&self, element: NodeId, local: &str) -> Option<&str> {
        self.attributes(element).iter().find_map(|&attr| match self.kind(attr) {
            NodeKind::Attribute { name, value }
                if name.namespace_uri().is_none() && name.local_name() == local =>
            {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// Last node of the subtree rooted at `id` (attributes included)
    #[must_use]
    pub fn last_in_subtree(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let data = &self.nodes[current.0];
            if let Some(&last) = data.children.last() {
                current = last;
            } else if let Some(&last) = data.attributes.last() {
                return last;
            } else {
                return current;
            }
        }
    }

    /// Descendants of `id` in document order, attributes excluded
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let end = self.last_in_subtree(id).0;
        (id.0 + 1..=end)
            .map(NodeId)
            .filter(move |&n| !self.kind(n).is_attribute())
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// True if `ancestor` is a proper ancestor of `id`
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor < id && self.last_in_subtree(ancestor) >= id
    }

    /// XPath string-value
    #[must_use]
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Root | NodeKind::Element { .. } => self
                .descendants(id)
                .filter_map(|n| match self.kind(n) {
                    NodeKind::Text { content, .. } => Some(content.as_str()),
                    _ => None,
                })
                .collect(),
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::Text { content, .. } => content.clone(),
            NodeKind::Comment(text) => text.clone(),
            NodeKind::ProcessingInstruction { data, .. } => data.clone(),
        }
    }

    /// Namespace declarations in scope at `id`, innermost first
    pub fn in_scope_namespaces(&self, id: NodeId) -> impl Iterator<Item = &NamespaceDecl> + '_ {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .flat_map(move |n| match self.kind(n) {
                NodeKind::Element { namespaces, .. } => namespaces.as_slice(),
                _ => &[],
            })
    }

    /// Borrowing handle for navigation
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node { doc: self, id }
    }
}

/// Borrowed view of one node
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Node<'a> {
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'a NodeKind {
        self.doc.kind(self.id)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&'a QName> {
        self.doc.name(self.id)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Node<'a>> {
        self.doc.parent(self.id).map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).iter().map(move |&id| doc.node(id))
    }

    pub fn attributes(&self) -> impl Iterator<Item = Node<'a>> + 'a {
        let doc = self.doc;
        doc.attributes(self.id).iter().map(move |&id| doc.node(id))
    }

    #[must_use]
    pub fn string_value(&self) -> String {
        self.doc.string_value(self.id)
    }

    /// Serialized form, as shown in result rows
    #[must_use]
    pub fn to_xml(&self) -> String {
        crate::serialize::to_xml_string(self.doc, self.id)
    }
}
