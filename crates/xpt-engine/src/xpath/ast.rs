//! Compiled expression tree

use super::functions::CoreFunction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Literal(String),
    Number(f64),
    Variable(String),
    Function(CoreFunction, Vec<Expr>),
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
    },
    Path {
        start: PathStart,
        steps: Vec<Step>,
    },
}

impl Expr {
    /// Height of the tree, measured with an explicit stack
    pub(crate) fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((expr, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let next = depth + 1;
            match expr {
                Self::Binary(_, left, right) | Self::Union(left, right) => {
                    stack.push((left, next));
                    stack.push((right, next));
                }
                Self::Negate(operand) => stack.push((operand, next)),
                Self::Function(_, args) => stack.extend(args.iter().map(|arg| (arg, next))),
                Self::Filter {
                    primary,
                    predicates,
                } => {
                    stack.push((primary, next));
                    stack.extend(predicates.iter().map(|p| (p, next)));
                }
                Self::Path { start, steps } => {
                    if let PathStart::Expr(filter) = start {
                        stack.push((filter, next));
                    }
                    for step in steps {
                        stack.extend(step.predicates.iter().map(|p| (p, next)));
                    }
                }
                Self::Literal(_) | Self::Number(_) | Self::Variable(_) => {}
            }
        }
        deepest
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathStart {
    /// `/...`
    Root,
    /// Relative location path
    Context,
    /// `filter/...`
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) axis: Axis,
    pub(crate) test: NodeTest,
    pub(crate) predicates: Vec<Expr>,
}

impl Step {
    pub(crate) fn new(axis: Axis, test: NodeTest) -> Self {
        Self {
            axis,
            test,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "attribute" => Self::Attribute,
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "following" => Self::Following,
            "following-sibling" => Self::FollowingSibling,
            "parent" => Self::Parent,
            "preceding" => Self::Preceding,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            _ => return None,
        })
    }

    /// Reverse axes number proximity positions from the context node backwards
    pub(crate) fn is_reverse(self) -> bool {
        matches!(
            self,
            Self::Ancestor | Self::AncestorOrSelf | Self::Preceding | Self::PrecedingSibling
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeTest {
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction('target'?)`
    ProcessingInstruction(Option<String>),
    /// `*`
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    /// `name` or `prefix:name`
    Name {
        prefix: Option<String>,
        local: String,
    },
}
