//! XPath values and the conversions between them

use crate::document::{Document, NodeId};

/// Result of evaluating an XPath expression
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Nodes in document order, without duplicates
    NodeSet(Vec<NodeId>),
    /// Boolean
    Boolean(bool),
    /// IEEE 754 double
    Number(f64),
    /// String
    String(String),
}

impl Value {
    /// `boolean()` conversion
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::NodeSet(nodes) => !nodes.is_empty(),
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
        }
    }

    /// `number()` conversion
    #[must_use]
    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            Self::NodeSet(_) | Self::String(_) => parse_number(&self.to_xpath_string(doc)),
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
        }
    }

    /// `string()` conversion
    #[must_use]
    pub fn to_xpath_string(&self, doc: &Document) -> String {
        match self {
            Self::NodeSet(nodes) => nodes
                .first()
                .map(|&id| doc.string_value(id))
                .unwrap_or_default(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
        }
    }
}

/// Format a number the way `string()` does
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        // f64 Display never uses exponent notation and drops a zero fraction
        format!("{n}")
    }
}

/// Parse a string the way `number()` does; anything else is NaN
#[must_use]
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next();
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let valid = all_digits(whole)
        && fraction.map_or(true, all_digits)
        && (!whole.is_empty() || fraction.is_some_and(|f| !f.is_empty()));
    if !valid {
        return f64::NAN;
    }
    trimmed
        .strip_suffix('.')
        .unwrap_or(trimmed)
        .parse()
        .unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-3.25), "-3.25");
        assert_eq!(format_number(1e21), "1000000000000000000000");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn number_parsing() {
        assert_eq!(parse_number(" 42 "), 42.0);
        assert_eq!(parse_number("-1.5"), -1.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert_eq!(parse_number("5."), 5.0);
        assert!(parse_number("").is_nan());
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("abc").is_nan());
        assert!(parse_number(".").is_nan());
        assert!(parse_number("Infinity").is_nan());
    }

    #[test]
    fn boolean_conversion() {
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::Number(0.0).to_boolean());
        assert!(Value::Number(-1.0).to_boolean());
        assert!(!Value::String(String::new()).to_boolean());
        assert!(Value::String("false".into()).to_boolean());
        assert!(!Value::NodeSet(vec![]).to_boolean());
    }

    #[test]
    fn scalar_conversions() {
        let doc = Document::new();
        assert_eq!(Value::Boolean(true).to_number(&doc), 1.0);
        assert_eq!(Value::Boolean(false).to_xpath_string(&doc), "false");
        assert_eq!(Value::Number(3.0).to_xpath_string(&doc), "3");
        assert_eq!(Value::NodeSet(vec![]).to_xpath_string(&doc), "");
    }
}
