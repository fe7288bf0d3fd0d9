//! Node serialization
//!
//! Elements with element-only content are indented two spaces per level;
//! as soon as an element holds text, its content is written inline.

use crate::document::{Document, NodeId, NodeKind};

const INDENT: &str = "  ";

/// Serialize the node `id` as XML text
#[must_use]
pub fn to_xml_string(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, Some(0), &mut out);
    out
}

/// Escape character data
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value
#[must_use]
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_indent(out: &mut String, level: usize) {
    for _ in 0..level {
        out.push_str(INDENT);
    }
}

enum Work {
    Node(NodeId, Option<usize>),
    Newline(usize),
    Close(NodeId),
}

/// Walks with an explicit stack so document depth never reaches the call stack
fn write_node(doc: &Document, id: NodeId, indent: Option<usize>, out: &mut String) {
    let mut stack = vec![Work::Node(id, indent)];
    while let Some(work) = stack.pop() {
        match work {
            Work::Newline(level) => {
                out.push('\n');
                push_indent(out, level);
            }
            Work::Close(element) => {
                if let Some(name) = doc.name(element) {
                    out.push_str("</");
                    out.push_str(&name.to_string());
                    out.push('>');
                }
            }
            Work::Node(id, indent) => write_open(doc, id, indent, out, &mut stack),
        }
    }
}

fn write_open(
    doc: &Document,
    id: NodeId,
    indent: Option<usize>,
    out: &mut String,
    stack: &mut Vec<Work>,
) {
    match doc.kind(id) {
        NodeKind::Root => {
            for (i, &child) in doc.children(id).iter().enumerate().rev() {
                stack.push(Work::Node(child, Some(0)));
                if i > 0 {
                    stack.push(Work::Newline(0));
                }
            }
        }
        NodeKind::Element { name, namespaces } => {
            out.push('<');
            out.push_str(&name.to_string());
            for decl in namespaces {
                match &decl.prefix {
                    Some(prefix) => out.push_str(&format!(" xmlns:{prefix}=\"")),
                    None => out.push_str(" xmlns=\""),
                }
                out.push_str(&escape_attribute(&decl.uri));
                out.push('"');
            }
            for &attr in doc.attributes(id) {
                out.push(' ');
                write_attribute(doc, attr, out);
            }

            let children = doc.children(id);
            if children.is_empty() {
                out.push_str(" />");
                return;
            }
            out.push('>');

            stack.push(Work::Close(id));
            let mixed = children.iter().any(|&c| doc.kind(c).is_text());
            match indent {
                Some(level) if !mixed => {
                    stack.push(Work::Newline(level));
                    for &child in children.iter().rev() {
                        stack.push(Work::Node(child, Some(level + 1)));
                        stack.push(Work::Newline(level + 1));
                    }
                }
                _ => stack.extend(children.iter().rev().map(|&child| Work::Node(child, None))),
            }
        }
        NodeKind::Attribute { .. } => write_attribute(doc, id, out),
        NodeKind::Text { content, cdata } => {
            if *cdata {
                out.push_str("<![CDATA[");
                out.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]>");
            } else {
                out.push_str(&escape_text(content));
            }
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}

fn write_attribute(doc: &Document, id: NodeId, out: &mut String) {
    if let NodeKind::Attribute { name, value } = doc.kind(id) {
        out.push_str(&format!("{name}=\"{}\"", escape_attribute(value)));
    }
}
