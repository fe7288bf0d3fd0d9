//! XPath tokenizer
//!
//! `*` and the operator names `and`, `or`, `div`, `mod` are ambiguous; they
//! are resolved from the preceding token as XPath 1.0 section 3.7 requires.

use crate::error::XPathError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `*` as a name test
    Star,
    /// `*` as an operator
    Multiply,
    And,
    Or,
    Div,
    Mod,
    Literal(String),
    Number(f64),
    Variable(String),
    Name {
        prefix: Option<String>,
        local: String,
    },
    /// `prefix:*`
    PrefixWildcard(String),
}

impl Token {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            Self::And
                | Self::Or
                | Self::Div
                | Self::Mod
                | Self::Multiply
                | Self::Slash
                | Self::DoubleSlash
                | Self::Pipe
                | Self::Plus
                | Self::Minus
                | Self::Eq
                | Self::NotEq
                | Self::Lt
                | Self::LtEq
                | Self::Gt
                | Self::GtEq
        )
    }

    /// True if a following `*` or NCName must be read as an operator
    fn forces_operator(prev: Option<&Token>) -> bool {
        match prev {
            None => false,
            Some(
                Self::At | Self::ColonColon | Self::LParen | Self::LBracket | Self::Comma,
            ) => false,
            Some(token) => !token.is_operator(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub(crate) token: Token,
    /// Character offset in the source
    pub(crate) position: usize,
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.'
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Spanned>, XPathError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let peek = chars.get(i + 1).copied();
        let operator_context = Token::forces_operator(tokens.last().map(|t| &t.token));

        let token = match c {
            '(' => {
                i += 1;
                Token::LParen
            }
            ')' => {
                i += 1;
                Token::RParen
            }
            '[' => {
                i += 1;
                Token::LBracket
            }
            ']' => {
                i += 1;
                Token::RBracket
            }
            '@' => {
                i += 1;
                Token::At
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            '|' => {
                i += 1;
                Token::Pipe
            }
            '+' => {
                i += 1;
                Token::Plus
            }
            '-' => {
                i += 1;
                Token::Minus
            }
            '=' => {
                i += 1;
                Token::Eq
            }
            '*' => {
                i += 1;
                if operator_context {
                    Token::Multiply
                } else {
                    Token::Star
                }
            }
            '!' if peek == Some('=') => {
                i += 2;
                Token::NotEq
            }
            '<' if peek == Some('=') => {
                i += 2;
                Token::LtEq
            }
            '<' => {
                i += 1;
                Token::Lt
            }
            '>' if peek == Some('=') => {
                i += 2;
                Token::GtEq
            }
            '>' => {
                i += 1;
                Token::Gt
            }
            '/' if peek == Some('/') => {
                i += 2;
                Token::DoubleSlash
            }
            '/' => {
                i += 1;
                Token::Slash
            }
            ':' if peek == Some(':') => {
                i += 2;
                Token::ColonColon
            }
            '.' if peek == Some('.') => {
                i += 2;
                Token::DotDot
            }
            '.' if peek.is_some_and(|p| p.is_ascii_digit()) => {
                let (number, next) = read_number(&chars, i);
                i = next;
                Token::Number(number)
            }
            '.' => {
                i += 1;
                Token::Dot
            }
            '"' | '\'' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or_else(|| XPathError::syntax(start, "unterminated string literal"))?;
                let literal: String = chars[i + 1..i + 1 + close].iter().collect();
                i += close + 2;
                Token::Literal(literal)
            }
            '$' => {
                i += 1;
                let (prefix, local, next) = read_qname(&chars, i)
                    .ok_or_else(|| XPathError::syntax(start, "expected a variable name after '$'"))?;
                i = next;
                match prefix {
                    Some(prefix) => Token::Variable(format!("{prefix}:{local}")),
                    None => Token::Variable(local),
                }
            }
            d if d.is_ascii_digit() => {
                let (number, next) = read_number(&chars, i);
                i = next;
                Token::Number(number)
            }
            n if is_name_start(n) => {
                let (first, next) = read_ncname(&chars, i);
                i = next;
                if operator_context {
                    match first.as_str() {
                        "and" => Token::And,
                        "or" => Token::Or,
                        "div" => Token::Div,
                        "mod" => Token::Mod,
                        _ => {
                            return Err(XPathError::syntax(
                                start,
                                format!("expected an operator, found '{first}'"),
                            ))
                        }
                    }
                } else if chars.get(i) == Some(&':') && chars.get(i + 1) == Some(&'*') {
                    i += 2;
                    Token::PrefixWildcard(first)
                } else if chars.get(i) == Some(&':')
                    && chars.get(i + 1).is_some_and(|&n| is_name_start(n))
                {
                    let (local, next) = read_ncname(&chars, i + 1);
                    i = next;
                    Token::Name {
                        prefix: Some(first),
                        local,
                    }
                } else {
                    Token::Name {
                        prefix: None,
                        local: first,
                    }
                }
            }
            other => {
                return Err(XPathError::syntax(
                    start,
                    format!("unexpected character '{other}'"),
                ))
            }
        };
        tokens.push(Spanned {
            token,
            position: start,
        });
    }

    Ok(tokens)
}

fn read_ncname(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_name_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn read_qname(chars: &[char], start: usize) -> Option<(Option<String>, String, usize)> {
    if !chars.get(start).is_some_and(|&c| is_name_start(c)) {
        return None;
    }
    let (first, next) = read_ncname(chars, start);
    if chars.get(next) == Some(&':') && chars.get(next + 1).is_some_and(|&c| is_name_start(c)) {
        let (local, end) = read_ncname(chars, next + 1);
        return Some((Some(first), local, end));
    }
    Some((None, first, next))
}

fn read_number(chars: &[char], start: usize) -> (f64, usize) {
    let mut end = start;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }
    if chars.get(end) == Some(&'.') {
        end += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    let text: String = chars[start..end].iter().collect();
    // "5." is valid XPath but not a valid Rust float literal
    let value = text.trim_end_matches('.').parse().unwrap_or(f64::NAN);
    (value, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    fn name(local: &str) -> Token {
        Token::Name {
            prefix: None,
            local: local.to_string(),
        }
    }

    #[test]
    fn star_disambiguation() {
        assert_eq!(tokens("*"), vec![Token::Star]);
        assert_eq!(
            tokens("2 * 3"),
            vec![Token::Number(2.0), Token::Multiply, Token::Number(3.0)]
        );
        assert_eq!(
            tokens("a/*"),
            vec![name("a"), Token::Slash, Token::Star]
        );
        assert_eq!(
            tokens("@*"),
            vec![Token::At, Token::Star]
        );
    }

    #[test]
    fn operator_names() {
        assert_eq!(
            tokens("div div div"),
            vec![name("div"), Token::Div, name("div")]
        );
        assert_eq!(
            tokens("a and b or c"),
            vec![name("a"), Token::And, name("b"), Token::Or, name("c")]
        );
    }

    #[test]
    fn qualified_names_and_axes() {
        assert_eq!(
            tokens("child::p:item"),
            vec![
                name("child"),
                Token::ColonColon,
                Token::Name {
                    prefix: Some("p".to_string()),
                    local: "item".to_string()
                }
            ]
        );
        assert_eq!(tokens("p:*"), vec![Token::PrefixWildcard("p".to_string())]);
    }

    #[test]
    fn literals_numbers_and_dots() {
        assert_eq!(
            tokens(r#"'a"b' "c'd""#),
            vec![Token::Literal("a\"b".into()), Token::Literal("c'd".into())]
        );
        assert_eq!(
            tokens(".5 1.25 7."),
            vec![Token::Number(0.5), Token::Number(1.25), Token::Number(7.0)]
        );
        assert_eq!(tokens("../."), vec![Token::DotDot, Token::Slash, Token::Dot]);
        assert_eq!(tokens("$v"), vec![Token::Variable("v".into())]);
    }

    #[test]
    fn hyphenated_names() {
        assert_eq!(tokens("foo-bar"), vec![name("foo-bar")]);
        assert_eq!(
            tokens("a - b"),
            vec![name("a"), Token::Minus, name("b")]
        );
    }

    #[test]
    fn errors_carry_position() {
        assert_eq!(
            tokenize("a ~").unwrap_err(),
            XPathError::syntax(2, "unexpected character '~'")
        );
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a b").is_err());
    }
}
