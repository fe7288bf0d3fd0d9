//! Expression evaluation over the arena document

use tracing::trace;

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathStart, Step};
use super::value::Value;
use crate::document::{Document, NodeId, NodeKind, XML_NAMESPACE};
use crate::error::XPathError;

/// Evaluation context: node, proximity position and size
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    pub(crate) node: NodeId,
    pub(crate) position: usize,
    pub(crate) size: usize,
}

impl Context {
    pub(crate) fn root() -> Self {
        Self {
            node: NodeId::ROOT,
            position: 1,
            size: 1,
        }
    }
}

pub(crate) struct Evaluator<'d> {
    pub(crate) doc: &'d Document,
}

impl<'d> Evaluator<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        Self { doc }
    }

    pub(crate) fn evaluate(&self, expr: &Expr, ctx: Context) -> Result<Value, XPathError> {
        match expr {
            Expr::Literal(text) => Ok(Value::String(text.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Variable(name) => Err(XPathError::UnboundVariable { name: name.clone() }),
            Expr::Negate(inner) => {
                let value = self.evaluate(inner, ctx)?;
                Ok(Value::Number(-value.to_number(self.doc)))
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right, ctx),
            Expr::Union(left, right) => {
                let mut nodes = self.node_set(left, ctx, "the union operator '|'")?;
                nodes.extend(self.node_set(right, ctx, "the union operator '|'")?);
                Ok(Value::NodeSet(sorted(nodes)))
            }
            Expr::Function(function, args) => self.call(*function, args, ctx),
            Expr::Filter {
                primary,
                predicates,
            } => {
                let mut nodes = self.node_set(primary, ctx, "a predicate")?;
                for predicate in predicates {
                    nodes = self.apply_predicate(&nodes, predicate)?;
                }
                Ok(Value::NodeSet(nodes))
            }
            Expr::Path { start, steps } => {
                let mut nodes = match start {
                    PathStart::Root => vec![NodeId::ROOT],
                    PathStart::Context => vec![ctx.node],
                    PathStart::Expr(inner) => self.node_set(inner, ctx, "a location step")?,
                };
                for step in steps {
                    let mut next = Vec::new();
                    for &node in &nodes {
                        next.extend(self.step(node, step)?);
                    }
                    nodes = sorted(next);
                }
                Ok(Value::NodeSet(nodes))
            }
        }
    }

    pub(crate) fn node_set(
        &self,
        expr: &Expr,
        ctx: Context,
        context: &str,
    ) -> Result<Vec<NodeId>, XPathError> {
        match self.evaluate(expr, ctx)? {
            Value::NodeSet(nodes) => Ok(nodes),
            _ => Err(XPathError::node_set_expected(context)),
        }
    }

    fn binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        ctx: Context,
    ) -> Result<Value, XPathError> {
        match op {
            BinaryOp::Or => {
                let result = self.evaluate(left, ctx)?.to_boolean()
                    || self.evaluate(right, ctx)?.to_boolean();
                Ok(Value::Boolean(result))
            }
            BinaryOp::And => {
                let result = self.evaluate(left, ctx)?.to_boolean()
                    && self.evaluate(right, ctx)?.to_boolean();
                Ok(Value::Boolean(result))
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq => {
                let l = self.evaluate(left, ctx)?;
                let r = self.evaluate(right, ctx)?;
                Ok(Value::Boolean(self.compare(op, &l, &r)))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let l = self.evaluate(left, ctx)?.to_number(self.doc);
                let r = self.evaluate(right, ctx)?.to_number(self.doc);
                Ok(Value::Number(match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    // truncating remainder, sign of the dividend
                    _ => l % r,
                }))
            }
        }
    }

    fn compare(&self, op: BinaryOp, left: &Value, right: &Value) -> bool {
        let doc = self.doc;
        match (left, right) {
            (Value::NodeSet(a), Value::NodeSet(b)) => {
                let b: Vec<String> = b.iter().map(|&n| doc.string_value(n)).collect();
                a.iter().any(|&n| {
                    let s = doc.string_value(n);
                    b.iter().any(|t| compare_strings(op, &s, t))
                })
            }
            (Value::NodeSet(_), Value::Boolean(_)) | (Value::Boolean(_), Value::NodeSet(_)) => {
                compare_scalars(
                    doc,
                    op,
                    &Value::Boolean(left.to_boolean()),
                    &Value::Boolean(right.to_boolean()),
                )
            }
            (Value::NodeSet(nodes), other) => nodes
                .iter()
                .any(|&n| compare_scalars(doc, op, &Value::String(doc.string_value(n)), other)),
            (other, Value::NodeSet(nodes)) => nodes
                .iter()
                .any(|&n| compare_scalars(doc, op, other, &Value::String(doc.string_value(n)))),
            _ => compare_scalars(doc, op, left, right),
        }
    }

    fn step(&self, node: NodeId, step: &Step) -> Result<Vec<NodeId>, XPathError> {
        let uri = match &step.test {
            NodeTest::PrefixWildcard(prefix)
            | NodeTest::Name {
                prefix: Some(prefix),
                ..
            } => Some(self.resolve_prefix(prefix)?),
            _ => None,
        };
        let mut candidates: Vec<NodeId> = self
            .axis(node, step.axis)
            .into_iter()
            .filter(|&id| self.matches(id, step.axis, &step.test, uri.as_deref()))
            .collect();
        // candidates are in axis order, so positions are proximity positions
        for predicate in &step.predicates {
            candidates = self.apply_predicate(&candidates, predicate)?;
        }
        trace!(axis = ?step.axis, count = candidates.len(), "location step");
        Ok(candidates)
    }

    fn apply_predicate(
        &self,
        nodes: &[NodeId],
        predicate: &Expr,
    ) -> Result<Vec<NodeId>, XPathError> {
        let size = nodes.len();
        let mut kept = Vec::new();
        for (i, &node) in nodes.iter().enumerate() {
            let ctx = Context {
                node,
                position: i + 1,
                size,
            };
            #[allow(clippy::cast_precision_loss)]
            let position = ctx.position as f64;
            let keep = match self.evaluate(predicate, ctx)? {
                Value::Number(n) => compare_numbers(BinaryOp::Eq, n, position),
                other => other.to_boolean(),
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    /// Nodes on `axis` from `node`, in axis order
    fn axis(&self, node: NodeId, axis: Axis) -> Vec<NodeId> {
        let mut nodes = self.axis_in_document_order(node, axis);
        if axis.is_reverse() {
            nodes.reverse();
        }
        nodes
    }

    fn axis_in_document_order(&self, node: NodeId, axis: Axis) -> Vec<NodeId> {
        let doc = self.doc;
        let is_attribute = doc.kind(node).is_attribute();
        match axis {
            Axis::SelfAxis => vec![node],
            Axis::Child => doc.children(node).to_vec(),
            Axis::Attribute => doc.attributes(node).to_vec(),
            Axis::Descendant => doc.descendants(node).collect(),
            Axis::DescendantOrSelf => std::iter::once(node).chain(doc.descendants(node)).collect(),
            Axis::Parent => doc.parent(node).into_iter().collect(),
            Axis::Ancestor | Axis::AncestorOrSelf => {
                let mut chain: Vec<NodeId> = doc.ancestors(node).collect();
                chain.reverse();
                if axis == Axis::AncestorOrSelf {
                    chain.push(node);
                }
                chain
            }
            Axis::FollowingSibling | Axis::PrecedingSibling if is_attribute => Vec::new(),
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = doc.parent(node) else {
                    return Vec::new();
                };
                let siblings = doc.children(parent);
                let Some(index) = siblings.iter().position(|&s| s == node) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[index + 1..].to_vec()
                } else {
                    siblings[..index].to_vec()
                }
            }
            Axis::Following => {
                let after = doc.last_in_subtree(node).index() + 1;
                (after..doc.len())
                    .filter_map(|i| doc.node_id(i))
                    .filter(|&id| !doc.kind(id).is_attribute())
                    .collect()
            }
            Axis::Preceding => (0..node.index())
                .filter_map(|i| doc.node_id(i))
                .filter(|&id| !doc.kind(id).is_attribute() && !doc.is_ancestor(id, node))
                .collect(),
        }
    }

    /// `uri` is the resolved namespace of a prefixed test
    fn matches(&self, id: NodeId, axis: Axis, test: &NodeTest, uri: Option<&str>) -> bool {
        let kind = self.doc.kind(id);
        let principal = if axis == Axis::Attribute {
            kind.is_attribute()
        } else {
            kind.is_element()
        };
        match test {
            NodeTest::Node => true,
            NodeTest::Text => kind.is_text(),
            NodeTest::Comment => matches!(kind, NodeKind::Comment(_)),
            NodeTest::ProcessingInstruction(wanted) => match kind {
                NodeKind::ProcessingInstruction { target, .. } => {
                    wanted.as_ref().map_or(true, |w| w == target)
                }
                _ => false,
            },
            NodeTest::Wildcard => principal,
            NodeTest::PrefixWildcard(_) => {
                principal && self.doc.name(id).is_some_and(|name| name.namespace_uri() == uri)
            }
            NodeTest::Name { local, .. } => {
                principal
                    && self.doc.name(id).is_some_and(|name| {
                        name.local_name() == local && name.namespace_uri() == uri
                    })
            }
        }
    }

    /// Resolve a prefix against the declarations on the document element
    fn resolve_prefix(&self, prefix: &str) -> Result<String, XPathError> {
        if prefix == "xml" {
            return Ok(XML_NAMESPACE.to_string());
        }
        self.doc
            .document_element()
            .and_then(|root| match self.doc.kind(root) {
                NodeKind::Element { namespaces, .. } => namespaces
                    .iter()
                    .find(|decl| decl.prefix.as_deref() == Some(prefix) && !decl.uri.is_empty())
                    .map(|decl| decl.uri.clone()),
                _ => None,
            })
            .ok_or_else(|| XPathError::UndefinedPrefix {
                prefix: prefix.to_string(),
            })
    }
}

/// Sort into document order and drop duplicates
pub(crate) fn sorted(mut nodes: Vec<NodeId>) -> Vec<NodeId> {
    nodes.sort_unstable();
    nodes.dedup();
    nodes
}

fn compare_strings(op: BinaryOp, left: &str, right: &str) -> bool {
    match op {
        BinaryOp::Eq => left == right,
        BinaryOp::NotEq => left != right,
        _ => compare_numbers(
            op,
            super::value::parse_number(left),
            super::value::parse_number(right),
        ),
    }
}

#[allow(clippy::float_cmp)]
fn compare_numbers(op: BinaryOp, left: f64, right: f64) -> bool {
    match op {
        BinaryOp::Eq => left == right,
        BinaryOp::NotEq => left != right,
        BinaryOp::Lt => left < right,
        BinaryOp::LtEq => left <= right,
        BinaryOp::Gt => left > right,
        BinaryOp::GtEq => left >= right,
        _ => false,
    }
}

fn compare_scalars(doc: &Document, op: BinaryOp, left: &Value, right: &Value) -> bool {
    let equality = matches!(op, BinaryOp::Eq | BinaryOp::NotEq);
    if !equality {
        return compare_numbers(op, left.to_number(doc), right.to_number(doc));
    }
    let eq = match (left, right) {
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => left.to_boolean() == right.to_boolean(),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            compare_numbers(BinaryOp::Eq, left.to_number(doc), right.to_number(doc))
        }
        _ => left.to_xpath_string(doc) == right.to_xpath_string(doc),
    };
    if op == BinaryOp::Eq {
        eq
    } else {
        !eq
    }
}
