//! Recursive-descent XPath 1.0 parser

use super::ast::{Axis, BinaryOp, Expr, NodeTest, PathStart, Step};
use super::functions::CoreFunction;
use super::lexer::{tokenize, Spanned, Token};
use crate::error::XPathError;

const NODE_TYPES: [&str; 4] = ["node", "text", "comment", "processing-instruction"];

/// Limit on parenthesized, argument and predicate nesting
const MAX_NESTING: usize = 64;

/// Limit on the height of the compiled tree
const MAX_DEPTH: usize = 256;

const TOO_DEEP: &str = "expression nested too deeply";

/// Compile `source` into an expression tree
pub(crate) fn parse(source: &str) -> Result<Expr, XPathError> {
    if source.trim().is_empty() {
        return Err(XPathError::Empty);
    }
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.chars().count(),
        nesting: 0,
    };
    let expr = parser.expr()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(XPathError::syntax(
            extra.position,
            format!("unexpected {}", describe(&extra.token)),
        ));
    }
    Ok(expr)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Name { prefix: Some(p), local } => format!("name '{p}:{local}'"),
        Token::Name { prefix: None, local } => format!("name '{local}'"),
        Token::Literal(s) => format!("literal '{s}'"),
        Token::Number(n) => format!("number {n}"),
        Token::Variable(v) => format!("variable ${v}"),
        Token::PrefixWildcard(p) => format!("'{p}:*'"),
        other => {
            let text = match other {
                Token::LParen => "(",
                Token::RParen => ")",
                Token::LBracket => "[",
                Token::RBracket => "]",
                Token::Dot => ".",
                Token::DotDot => "..",
                Token::At => "@",
                Token::Comma => ",",
                Token::ColonColon => "::",
                Token::Slash => "/",
                Token::DoubleSlash => "//",
                Token::Pipe => "|",
                Token::Plus => "+",
                Token::Minus => "-",
                Token::Eq => "=",
                Token::NotEq => "!=",
                Token::Lt => "<",
                Token::LtEq => "<=",
                Token::Gt => ">",
                Token::GtEq => ">=",
                Token::Star | Token::Multiply => "*",
                Token::And => "and",
                Token::Or => "or",
                Token::Div => "div",
                Token::Mod => "mod",
                _ => "token",
            };
            format!("'{text}'")
        }
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Position reported for errors at end of input
    end: usize,
    nesting: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), XPathError> {
        if self.eat(expected) {
            return Ok(());
        }
        let found = self
            .peek()
            .map_or_else(|| "end of expression".to_string(), describe);
        Err(XPathError::syntax(
            self.position(),
            format!("expected {}, found {found}", describe(expected)),
        ))
    }

    fn unexpected(&self) -> XPathError {
        match self.peek() {
            Some(token) => XPathError::syntax(
                self.position(),
                format!("unexpected {}", describe(token)),
            ),
            None => XPathError::syntax(self.end, "unexpected end of expression"),
        }
    }

    fn expr(&mut self) -> Result<Expr, XPathError> {
        if self.nesting == MAX_NESTING {
            return Err(XPathError::syntax(self.position(), TOO_DEEP));
        }
        self.nesting += 1;
        let expr = self.or_expr();
        self.nesting -= 1;
        expr
    }

    /// Height of a node joining `left` and `right`, rejected past [`MAX_DEPTH`]
    fn joined_depth(left: usize, right: &Expr, position: usize) -> Result<usize, XPathError> {
        let depth = 1 + left.max(right.depth());
        if depth > MAX_DEPTH {
            return Err(XPathError::syntax(position, TOO_DEEP));
        }
        Ok(depth)
    }

    fn binary_level(
        &mut self,
        operators: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, XPathError>,
    ) -> Result<Expr, XPathError> {
        let mut left = next(self)?;
        let mut depth = left.depth();
        'outer: loop {
            for (token, op) in operators {
                let position = self.position();
                if self.eat(token) {
                    let right = next(self)?;
                    depth = Self::joined_depth(depth, &right, position)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn or_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(&[(Token::Or, BinaryOp::Or)], Self::and_expr)
    }

    fn and_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(&[(Token::And, BinaryOp::And)], Self::equality_expr)
    }

    fn equality_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[(Token::Eq, BinaryOp::Eq), (Token::NotEq, BinaryOp::NotEq)],
            Self::relational_expr,
        )
    }

    fn relational_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::LtEq, BinaryOp::LtEq),
                (Token::Gt, BinaryOp::Gt),
                (Token::GtEq, BinaryOp::GtEq),
            ],
            Self::additive_expr,
        )
    }

    fn additive_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative_expr,
        )
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        self.binary_level(
            &[
                (Token::Multiply, BinaryOp::Mul),
                (Token::Div, BinaryOp::Div),
                (Token::Mod, BinaryOp::Mod),
            ],
            Self::unary_expr,
        )
    }

    fn unary_expr(&mut self) -> Result<Expr, XPathError> {
        let mut minuses = 0usize;
        while self.eat(&Token::Minus) {
            minuses += 1;
        }
        let operand = self.union_expr()?;
        // Pairs of minuses cancel, but one pair stays to keep the number conversion
        Ok(match minuses {
            0 => operand,
            n if n % 2 == 1 => Expr::Negate(Box::new(operand)),
            _ => Expr::Negate(Box::new(Expr::Negate(Box::new(operand)))),
        })
    }

    fn union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.path_expr()?;
        let mut depth = left.depth();
        loop {
            let position = self.position();
            if !self.eat(&Token::Pipe) {
                return Ok(left);
            }
            let right = self.path_expr()?;
            depth = Self::joined_depth(depth, &right, position)?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
    }

    fn starts_filter_expr(&self) -> bool {
        match self.peek() {
            Some(Token::Variable(_) | Token::LParen | Token::Literal(_) | Token::Number(_)) => true,
            Some(Token::Name { prefix, local }) => {
                self.peek_at(1) == Some(&Token::LParen)
                    && (prefix.is_some() || !NODE_TYPES.contains(&local.as_str()))
            }
            _ => false,
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::Star
                    | Token::Name { .. }
                    | Token::PrefixWildcard(_)
            )
        )
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        if self.starts_filter_expr() {
            let filter = self.filter_expr()?;
            let mut steps = Vec::new();
            if !self.continue_path(&mut steps)? {
                return Ok(filter);
            }
            return Ok(Expr::Path {
                start: PathStart::Expr(Box::new(filter)),
                steps,
            });
        }

        let mut steps = Vec::new();
        let start = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.starts_step() {
                    self.relative_path(&mut steps)?;
                }
                PathStart::Root
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(descendant_or_self());
                self.relative_path(&mut steps)?;
                PathStart::Root
            }
            _ => {
                if !self.starts_step() {
                    return Err(self.unexpected());
                }
                self.relative_path(&mut steps)?;
                PathStart::Context
            }
        };
        Ok(Expr::Path { start, steps })
    }

    /// Parse `/step` and `//step` continuations; false if there were none
    fn continue_path(&mut self, steps: &mut Vec<Step>) -> Result<bool, XPathError> {
        let mut any = false;
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(any);
            }
            any = true;
        }
    }

    fn relative_path(&mut self, steps: &mut Vec<Step>) -> Result<(), XPathError> {
        steps.push(self.step()?);
        self.continue_path(steps)?;
        Ok(())
    }

    fn filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        if predicates.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
        })
    }

    fn primary_expr(&mut self) -> Result<Expr, XPathError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Variable(name)) => Ok(Expr::Variable(name)),
            Some(Token::Literal(text)) => Ok(Expr::Literal(text)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name { prefix, local }) => {
                let display = match &prefix {
                    Some(p) => format!("{p}:{local}"),
                    None => local.clone(),
                };
                let function = prefix
                    .is_none()
                    .then(|| CoreFunction::from_name(&local))
                    .flatten()
                    .ok_or_else(|| XPathError::UnknownFunction { name: display })?;
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                function.check_arity(args.len())?;
                Ok(Expr::Function(function, args))
            }
            _ => Err(XPathError::syntax(position, "expected an expression")),
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step::new(Axis::Parent, NodeTest::Node));
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name { prefix: None, local }), Some(Token::ColonColon)) =
            (self.peek(), self.peek_at(1))
        {
            let position = self.position();
            let axis = match local.as_str() {
                "namespace" => {
                    return Err(XPathError::Unsupported {
                        feature: "the namespace axis".to_string(),
                    })
                }
                name => Axis::from_name(name).ok_or_else(|| {
                    XPathError::syntax(position, format!("unknown axis '{name}'"))
                })?,
            };
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let mut step = Step::new(axis, test);
        step.predicates = self.predicates()?;
        Ok(step)
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Wildcard),
            Some(Token::PrefixWildcard(prefix)) => Ok(NodeTest::PrefixWildcard(prefix)),
            Some(Token::Name {
                prefix: None,
                local,
            }) if self.peek() == Some(&Token::LParen) && NODE_TYPES.contains(&local.as_str()) => {
                self.pos += 1;
                let test = match local.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek() {
                        Some(Token::Literal(target)) => {
                            let target = target.clone();
                            self.pos += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(&Token::RParen)?;
                Ok(test)
            }
            Some(Token::Name { prefix, local }) => Ok(NodeTest::Name { prefix, local }),
            _ => Err(XPathError::syntax(position, "expected a node test")),
        }
    }
}

fn descendant_or_self() -> Step {
    Step::new(Axis::DescendantOrSelf, NodeTest::Node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_test(local: &str) -> NodeTest {
        NodeTest::Name {
            prefix: None,
            local: local.to_string(),
        }
    }

    #[test]
    fn abbreviated_descendant_path() {
        let expr = parse("//item").unwrap();
        assert_eq!(
            expr,
            Expr::Path {
                start: PathStart::Root,
                steps: vec![
                    descendant_or_self(),
                    Step::new(Axis::Child, name_test("item")),
                ],
            }
        );
    }

    #[test]
    fn root_only() {
        assert_eq!(
            parse("/").unwrap(),
            Expr::Path {
                start: PathStart::Root,
                steps: vec![]
            }
        );
    }

    #[test]
    fn operator_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))
            )
        );
    }

    #[test]
    fn explicit_axes_and_node_types() {
        let expr = parse("ancestor-or-self::node()/processing-instruction('x')").unwrap();
        let Expr::Path { steps, .. } = expr else {
            panic!("expected a path");
        };
        assert_eq!(steps[0].axis, Axis::AncestorOrSelf);
        assert_eq!(steps[0].test, NodeTest::Node);
        assert_eq!(
            steps[1].test,
            NodeTest::ProcessingInstruction(Some("x".to_string()))
        );
    }

    #[test]
    fn filter_expression_with_path() {
        let expr = parse("(//a)[1]/b").unwrap();
        assert!(matches!(
            expr,
            Expr::Path {
                start: PathStart::Expr(_),
                ..
            }
        ));
    }

    #[test]
    fn function_arity_is_checked() {
        assert!(matches!(
            parse("count()").unwrap_err(),
            XPathError::Arity { .. }
        ));
        assert!(matches!(
            parse("concat('a')").unwrap_err(),
            XPathError::Arity { .. }
        ));
        assert!(parse("concat('a', 'b', 'c')").is_ok());
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(parse("   ").unwrap_err(), XPathError::Empty);
        assert!(matches!(
            parse("frobnicate(1)").unwrap_err(),
            XPathError::UnknownFunction { .. }
        ));
        assert!(matches!(
            parse("namespace::*").unwrap_err(),
            XPathError::Unsupported { .. }
        ));
        assert!(matches!(
            parse("//item[").unwrap_err(),
            XPathError::Syntax { .. }
        ));
        assert!(matches!(
            parse("bogus::x").unwrap_err(),
            XPathError::Syntax { .. }
        ));
        assert!(matches!(parse("a)").unwrap_err(), XPathError::Syntax { .. }));
    }

    fn too_deep(result: Result<Expr, XPathError>) -> bool {
        matches!(result, Err(XPathError::Syntax { message, .. }) if message == TOO_DEEP)
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let source = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        assert!(too_deep(parse(&source)));

        let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(parse(&source).unwrap(), Expr::Number(1.0));
    }

    #[test]
    fn deep_predicates_and_arguments_are_rejected() {
        let source = format!("{}1{}", "a[".repeat(500), "]".repeat(500));
        assert!(too_deep(parse(&source)));
        let source = format!("{}1{}", "not(".repeat(500), ")".repeat(500));
        assert!(too_deep(parse(&source)));
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        let source = vec!["1"; 5000].join(" + ");
        assert!(too_deep(parse(&source)));
        let source = vec!["a"; 5000].join(" | ");
        assert!(too_deep(parse(&source)));
        assert!(parse(&vec!["1"; 100].join(" + ")).is_ok());
    }

    #[test]
    fn repeated_minus_collapses() {
        let odd = format!("{}1", "-".repeat(5001));
        assert_eq!(
            parse(&odd).unwrap(),
            Expr::Negate(Box::new(Expr::Number(1.0)))
        );
        let even = format!("{}'2'", "-".repeat(5000));
        assert_eq!(parse(&even).unwrap().depth(), 3);
    }
}
