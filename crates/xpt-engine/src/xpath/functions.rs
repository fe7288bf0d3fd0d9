//! XPath 1.0 core function library

use super::ast::Expr;
use super::eval::{sorted, Context, Evaluator};
use super::value::Value;
use crate::document::{NodeId, NodeKind, XML_NAMESPACE};
use crate::error::XPathError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CoreFunction {
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    Boolean,
    Not,
    True,
    False,
    Lang,
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

const FUNCTIONS: [(&str, CoreFunction); 27] = [
    ("last", CoreFunction::Last),
    ("position", CoreFunction::Position),
    ("count", CoreFunction::Count),
    ("id", CoreFunction::Id),
    ("local-name", CoreFunction::LocalName),
    ("namespace-uri", CoreFunction::NamespaceUri),
    ("name", CoreFunction::Name),
    ("string", CoreFunction::String),
    ("concat", CoreFunction::Concat),
    ("starts-with", CoreFunction::StartsWith),
    ("contains", CoreFunction::Contains),
    ("substring-before", CoreFunction::SubstringBefore),
    ("substring-after", CoreFunction::SubstringAfter),
    ("substring", CoreFunction::Substring),
    ("string-length", CoreFunction::StringLength),
    ("normalize-space", CoreFunction::NormalizeSpace),
    ("translate", CoreFunction::Translate),
    ("boolean", CoreFunction::Boolean),
    ("not", CoreFunction::Not),
    ("true", CoreFunction::True),
    ("false", CoreFunction::False),
    ("lang", CoreFunction::Lang),
    ("number", CoreFunction::Number),
    ("sum", CoreFunction::Sum),
    ("floor", CoreFunction::Floor),
    ("ceiling", CoreFunction::Ceiling),
    ("round", CoreFunction::Round),
];

impl CoreFunction {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        FUNCTIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|&(_, f)| f)
    }

    pub(crate) fn name(self) -> &'static str {
        FUNCTIONS
            .iter()
            .find(|(_, f)| *f == self)
            .map_or("?", |&(n, _)| n)
    }

    /// Minimum and optional maximum argument count
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::Last | Self::Position | Self::True | Self::False => (0, Some(0)),
            Self::LocalName
            | Self::NamespaceUri
            | Self::Name
            | Self::String
            | Self::StringLength
            | Self::NormalizeSpace
            | Self::Number => (0, Some(1)),
            Self::Count
            | Self::Id
            | Self::Boolean
            | Self::Not
            | Self::Lang
            | Self::Sum
            | Self::Floor
            | Self::Ceiling
            | Self::Round => (1, Some(1)),
            Self::StartsWith | Self::Contains | Self::SubstringBefore | Self::SubstringAfter => {
                (2, Some(2))
            }
            Self::Substring => (2, Some(3)),
            Self::Translate => (3, Some(3)),
            Self::Concat => (2, None),
        }
    }

    pub(crate) fn check_arity(self, found: usize) -> Result<(), XPathError> {
        let (min, max) = self.arity();
        if found >= min && max.map_or(true, |max| found <= max) {
            return Ok(());
        }
        let expected = match max {
            None => format!("at least {min}"),
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} or {max}"),
        };
        Err(XPathError::Arity {
            name: self.name().to_string(),
            expected,
            found,
        })
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// XPath `round()`: half rounds towards positive infinity
fn round(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else if (-0.5..0.0).contains(&n) {
        -0.0
    } else {
        (n + 0.5).floor()
    }
}

fn substring(text: &str, start: f64, length: Option<f64>) -> String {
    let first = round(start);
    let end = length.map_or(f64::INFINITY, |len| first + round(len));
    text.chars()
        .enumerate()
        .filter(|&(i, _)| {
            #[allow(clippy::cast_precision_loss)]
            let position = (i + 1) as f64;
            position >= first && position < end
        })
        .map(|(_, c)| c)
        .collect()
}

fn translate(text: &str, from: &str, to: &str) -> String {
    let to: Vec<char> = to.chars().collect();
    let mut map: Vec<(char, Option<char>)> = Vec::new();
    for (i, c) in from.chars().enumerate() {
        if !map.iter().any(|(k, _)| *k == c) {
            map.push((c, to.get(i).copied()));
        }
    }
    text.chars()
        .filter_map(|c| match map.iter().find(|(k, _)| *k == c) {
            Some((_, replacement)) => *replacement,
            None => Some(c),
        })
        .collect()
}

impl Evaluator<'_> {
    pub(crate) fn call(
        &self,
        function: CoreFunction,
        args: &[Expr],
        ctx: Context,
    ) -> Result<Value, XPathError> {
        let doc = self.doc;
        let string_arg = |i: usize| -> Result<String, XPathError> {
            match args.get(i) {
                Some(expr) => Ok(self.evaluate(expr, ctx)?.to_xpath_string(doc)),
                None => Ok(doc.string_value(ctx.node)),
            }
        };
        let number_arg = |i: usize| -> Result<f64, XPathError> {
            match args.get(i) {
                Some(expr) => Ok(self.evaluate(expr, ctx)?.to_number(doc)),
                None => Ok(super::value::parse_number(&doc.string_value(ctx.node))),
            }
        };
        // first node of the optional node-set argument, or the context node
        let node_arg = |label: &str| -> Result<Option<NodeId>, XPathError> {
            match args.first() {
                Some(expr) => Ok(self.node_set(expr, ctx, label)?.first().copied()),
                None => Ok(Some(ctx.node)),
            }
        };

        #[allow(clippy::cast_precision_loss)]
        let value = match function {
            CoreFunction::Last => Value::Number(ctx.size as f64),
            CoreFunction::Position => Value::Number(ctx.position as f64),
            CoreFunction::Count => {
                Value::Number(self.node_set(&args[0], ctx, "count()")?.len() as f64)
            }
            CoreFunction::Id => {
                let tokens = match self.evaluate(&args[0], ctx)? {
                    Value::NodeSet(nodes) => nodes
                        .iter()
                        .map(|&n| doc.string_value(n))
                        .collect::<Vec<_>>()
                        .join(" "),
                    other => other.to_xpath_string(doc),
                };
                Value::NodeSet(self.elements_by_id(&tokens))
            }
            CoreFunction::LocalName => {
                let name = node_arg("local-name()")?
                    .map(|n| match doc.kind(n) {
                        NodeKind::ProcessingInstruction { target, .. } => target.clone(),
                        _ => doc
                            .name(n)
                            .map(|q| q.local_name().to_string())
                            .unwrap_or_default(),
                    })
                    .unwrap_or_default();
                Value::String(name)
            }
            CoreFunction::NamespaceUri => {
                let uri = node_arg("namespace-uri()")?
                    .and_then(|n| doc.name(n))
                    .and_then(|q| q.namespace_uri())
                    .unwrap_or_default()
                    .to_string();
                Value::String(uri)
            }
            CoreFunction::Name => {
                let name = node_arg("name()")?
                    .map(|n| match doc.kind(n) {
                        NodeKind::ProcessingInstruction { target, .. } => target.clone(),
                        _ => doc.name(n).map(ToString::to_string).unwrap_or_default(),
                    })
                    .unwrap_or_default();
                Value::String(name)
            }
            CoreFunction::String => Value::String(string_arg(0)?),
            CoreFunction::Concat => {
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(&string_arg(i)?);
                }
                Value::String(out)
            }
            CoreFunction::StartsWith => Value::Boolean(string_arg(0)?.starts_with(&string_arg(1)?)),
            CoreFunction::Contains => Value::Boolean(string_arg(0)?.contains(&string_arg(1)?)),
            CoreFunction::SubstringBefore => {
                let (text, pattern) = (string_arg(0)?, string_arg(1)?);
                Value::String(
                    text.split_once(pattern.as_str())
                        .map(|(before, _)| before.to_string())
                        .unwrap_or_default(),
                )
            }
            CoreFunction::SubstringAfter => {
                let (text, pattern) = (string_arg(0)?, string_arg(1)?);
                Value::String(
                    text.split_once(pattern.as_str())
                        .map(|(_, after)| after.to_string())
                        .unwrap_or_default(),
                )
            }
            CoreFunction::Substring => {
                let text = string_arg(0)?;
                let start = number_arg(1)?;
                let length = if args.len() > 2 {
                    Some(number_arg(2)?)
                } else {
                    None
                };
                Value::String(substring(&text, start, length))
            }
            CoreFunction::StringLength => Value::Number(string_arg(0)?.chars().count() as f64),
            CoreFunction::NormalizeSpace => Value::String(
                string_arg(0)?
                    .split(is_xml_space)
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            CoreFunction::Translate => {
                Value::String(translate(&string_arg(0)?, &string_arg(1)?, &string_arg(2)?))
            }
            CoreFunction::Boolean => Value::Boolean(self.evaluate(&args[0], ctx)?.to_boolean()),
            CoreFunction::Not => Value::Boolean(!self.evaluate(&args[0], ctx)?.to_boolean()),
            CoreFunction::True => Value::Boolean(true),
            CoreFunction::False => Value::Boolean(false),
            CoreFunction::Lang => {
                let wanted = string_arg(0)?;
                Value::Boolean(self.lang_matches(ctx.node, &wanted))
            }
            CoreFunction::Number => Value::Number(number_arg(0)?),
            CoreFunction::Sum => {
                let nodes = self.node_set(&args[0], ctx, "sum()")?;
                Value::Number(
                    nodes
                        .iter()
                        .map(|&n| super::value::parse_number(&doc.string_value(n)))
                        .sum(),
                )
            }
            CoreFunction::Floor => Value::Number(number_arg(0)?.floor()),
            CoreFunction::Ceiling => Value::Number(number_arg(0)?.ceil()),
            CoreFunction::Round => Value::Number(round(number_arg(0)?)),
        };
        Ok(value)
    }

    /// Elements whose `id` or `xml:id` attribute matches one of the tokens
    fn elements_by_id(&self, tokens: &str) -> Vec<NodeId> {
        let doc = self.doc;
        let wanted: Vec<&str> = tokens.split(is_xml_space).filter(|t| !t.is_empty()).collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        let found = doc
            .descendants(NodeId::ROOT)
            .filter(|&n| doc.kind(n).is_element())
            .filter(|&n| {
                doc.attributes(n).iter().any(|&a| match doc.kind(a) {
                    NodeKind::Attribute { name, value } => {
                        let is_id = name.local_name() == "id"
                            && matches!(name.namespace_uri(), None | Some(XML_NAMESPACE));
                        is_id && wanted.contains(&value.as_str())
                    }
                    _ => false,
                })
            })
            .collect();
        sorted(found)
    }

    /// `lang()`: nearest `xml:lang` on the context node or its ancestors
    fn lang_matches(&self, node: NodeId, wanted: &str) -> bool {
        let doc = self.doc;
        let declared = std::iter::once(node)
            .chain(doc.ancestors(node))
            .find_map(|n| {
                doc.attributes(n).iter().find_map(|&a| match doc.kind(a) {
                    NodeKind::Attribute { name, value }
                        if name.local_name() == "lang"
                            && name.namespace_uri() == Some(XML_NAMESPACE) =>
                    {
                        Some(value.as_str())
                    }
                    _ => None,
                })
            });
        let Some(declared) = declared else {
            return false;
        };
        let declared = declared.to_ascii_lowercase();
        let wanted = wanted.to_ascii_lowercase();
        declared == wanted
            || declared
                .strip_prefix(wanted.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_arity() {
        assert_eq!(CoreFunction::from_name("count"), Some(CoreFunction::Count));
        assert_eq!(CoreFunction::from_name("matches"), None);
        assert_eq!(CoreFunction::Substring.name(), "substring");
        assert!(CoreFunction::Substring.check_arity(3).is_ok());
        assert_eq!(
            CoreFunction::Substring.check_arity(1).unwrap_err(),
            XPathError::Arity {
                name: "substring".to_string(),
                expected: "2 or 3".to_string(),
                found: 1
            }
        );
        assert!(CoreFunction::Concat.check_arity(9).is_ok());
    }

    #[test]
    fn substring_rounding_rules() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
        assert_eq!(substring("12345", 1.0, Some(f64::NAN)), "");
        assert_eq!(substring("12345", -42.0, Some(f64::INFINITY)), "12345");
        assert_eq!(substring("12345", f64::NEG_INFINITY, Some(f64::INFINITY)), "");
        assert_eq!(substring("12345", 2.0, None), "2345");
    }

    #[test]
    fn round_half_up() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert!(round(-0.2).is_sign_negative());
        assert!(round(f64::NAN).is_nan());
    }

    #[test]
    fn translate_maps_and_removes() {
        assert_eq!(translate("bar", "abc", "ABC"), "BAr");
        assert_eq!(translate("--aaa--", "abc-", "ABC"), "AAA");
        assert_eq!(translate("aa", "aa", "xy"), "xx");
    }
}
