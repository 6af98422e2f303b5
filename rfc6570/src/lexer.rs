//! Tokenizer for URI template patterns
//!
//! This module scans a pattern string into literal and expression tokens.
//! It is the only place where syntax errors are raised.

use std::sync::LazyLock;

use crate::ast::{ClassItem, Expr, Quantifier};
use crate::engine::Regex;
use crate::error::{Result, TemplateError};
use crate::operator::{Operator, pct_triplet};
use crate::token::{Expression, Token, VariableSpec};

/// Characters that may never appear unescaped in a literal
const EXCLUDED_LITERALS: [char; 11] = ['"', '\'', '%', '<', '>', '\\', '^', '`', '{', '|', '}'];

/// Most digits in a prefix length, so that it always fits a `u32`.
/// `:0` means no prefix.
const MAX_LENGTH_DIGITS: usize = 9;

/// Whether `c` can appear as itself in a literal
pub fn is_literal_char(c: char) -> bool {
    !EXCLUDED_LITERALS.contains(&c) && !c.is_control() && !c.is_whitespace()
}

/// Lexer for URI template patterns
pub struct Lexer<'a> {
    input: &'a str,
    /// Byte offset of the next unread character
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given pattern
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    fn current(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.position += c.len_utf8();
        }
    }

    /// Consume `expected` if it is the current character
    fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a `%XX` triplet
    fn read_pct_triplet(&mut self) -> Option<&'a str> {
        let rest = self.input[self.position..].as_bytes();
        if rest.len() >= 3
            && rest[0] == b'%'
            && rest[1].is_ascii_hexdigit()
            && rest[2].is_ascii_hexdigit()
        {
            let triplet = &self.input[self.position..self.position + 3];
            self.position += 3;
            Some(triplet)
        } else {
            None
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while self.position < self.input.len() {
            let start = self.position;
            if self.current() == Some('{') {
                match self.read_expression() {
                    Some(expr) => tokens.push(Token::Expression(expr)),
                    None => return Err(TemplateError::invalid(self.input, start)),
                }
            } else {
                let literal = self.read_literal();
                if literal.is_empty() {
                    return Err(TemplateError::invalid(self.input, start));
                }
                tokens.push(Token::Literal(literal.to_string()));
            }
        }
        Ok(tokens)
    }

    /// Read a maximal run of literal characters and pct-triplets
    fn read_literal(&mut self) -> &'a str {
        let start = self.position;
        loop {
            match self.current() {
                Some('%') => {
                    if self.read_pct_triplet().is_none() {
                        break;
                    }
                }
                Some(c) if is_literal_char(c) => self.advance(),
                _ => break,
            }
        }
        &self.input[start..self.position]
    }

    /// Read `{` operator? varspec ("," varspec)* `}`
    fn read_expression(&mut self) -> Option<Expression> {
        if !self.eat('{') {
            return None;
        }
        let operator = match self.current().and_then(Operator::from_char) {
            Some(op) => {
                self.advance();
                op
            }
            None => Operator::Simple,
        };

        let mut variables = vec![self.read_varspec()?];
        while self.eat(',') {
            variables.push(self.read_varspec()?);
        }
        if !self.eat('}') {
            return None;
        }
        Some(Expression::new(operator, variables))
    }

    fn read_varspec(&mut self) -> Option<VariableSpec> {
        let name = self.read_varname()?;
        let mut var = VariableSpec::new(name);
        if self.eat('*') {
            var.explode = true;
        } else if self.eat(':') {
            var.max_length = self.read_max_length()?;
        }
        Some(var)
    }

    /// Read `varchar *( ["."] varchar )`
    fn read_varname(&mut self) -> Option<&'a str> {
        let start = self.position;
        if !self.read_varchar() {
            return None;
        }
        loop {
            let checkpoint = self.position;
            let dotted = self.eat('.');
            if !self.read_varchar() {
                if dotted {
                    // a name can't end with a dot
                    self.position = checkpoint;
                    return None;
                }
                break;
            }
        }
        Some(&self.input[start..self.position])
    }

    fn read_varchar(&mut self) -> bool {
        match self.current() {
            Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
                self.advance();
                true
            }
            Some('%') => self.read_pct_triplet().is_some(),
            _ => false,
        }
    }

    fn read_max_length(&mut self) -> Option<usize> {
        let start = self.position;
        match self.current() {
            Some(c) if c.is_ascii_digit() => self.advance(),
            _ => return None,
        }
        while self.position - start < MAX_LENGTH_DIGITS
            && self.current().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
        }
        self.input[start..self.position].parse().ok()
    }
}

/// Tokenize a pattern string
pub fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    Lexer::new(pattern).tokenize()
}

/// The full template grammar as one anchored automaton
static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| Regex::from_expr(&grammar()));

/// Whether `pattern` is a syntactically valid template
pub fn is_valid(pattern: &str) -> bool {
    GRAMMAR.is_match(pattern)
}

/// `\A(?:LITERAL|EXPRESSION)*\z`
fn grammar() -> Expr {
    Expr::sequence(vec![
        Expr::start_anchor(),
        Expr::quantified(
            Expr::alternation(vec![literal_unit(), expression()]),
            Quantifier::ZeroOrMore,
        ),
        Expr::end_anchor(),
    ])
}

fn literal_unit() -> Expr {
    let mut excluded: Vec<ClassItem> = EXCLUDED_LITERALS
        .iter()
        .copied()
        .map(ClassItem::Char)
        .collect();
    excluded.push(ClassItem::Range('\u{0}', '\u{1f}'));
    excluded.push(ClassItem::Range('\u{7f}', '\u{9f}'));
    excluded.push(ClassItem::Whitespace);
    Expr::alternation(vec![Expr::char_class(true, excluded), pct_triplet()])
}

fn expression() -> Expr {
    let operators = Operator::ALL
        .iter()
        .filter_map(|op| op.symbol())
        .map(ClassItem::Char)
        .collect();
    let varchar = || {
        Expr::alternation(vec![
            Expr::char_class(
                false,
                vec![
                    ClassItem::Range('A', 'Z'),
                    ClassItem::Range('a', 'z'),
                    ClassItem::Range('0', '9'),
                    ClassItem::Char('_'),
                ],
            ),
            pct_triplet(),
        ])
    };
    let varname = Expr::sequence(vec![
        varchar(),
        Expr::quantified(
            Expr::sequence(vec![Expr::optional(Expr::literal('.')), varchar()]),
            Quantifier::ZeroOrMore,
        ),
    ]);
    let max_length = Expr::sequence(vec![
        Expr::literal(':'),
        Expr::char_class(false, vec![ClassItem::Range('0', '9')]),
        Expr::quantified(
            Expr::char_class(false, vec![ClassItem::Range('0', '9')]),
            Quantifier::Between(0, MAX_LENGTH_DIGITS as u32 - 1),
        ),
    ]);
    let varspec = || {
        Expr::sequence(vec![
            varname.clone(),
            Expr::optional(Expr::alternation(vec![Expr::literal('*'), max_length.clone()])),
        ])
    };
    Expr::sequence(vec![
        Expr::literal('{'),
        Expr::optional(Expr::char_class(false, operators)),
        varspec(),
        Expr::quantified(
            Expr::sequence(vec![Expr::literal(','), varspec()]),
            Quantifier::ZeroOrMore,
        ),
        Expr::literal('}'),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> VariableSpec {
        VariableSpec::new(name)
    }

    #[test]
    fn test_tokenize_literal_only() {
        assert_eq!(tokenize("/foo/bar").unwrap(), vec![Token::literal("/foo/bar")]);
        assert_eq!(tokenize("").unwrap(), vec![]);
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("/foo{/bar}{?x,y*}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::literal("/foo"),
                Token::expression(Operator::Path, vec![var("bar")]),
                Token::expression(Operator::Query, vec![var("x"), var("y").exploded()]),
            ]
        );
    }

    #[test]
    fn test_tokenize_modifiers() {
        let tokens = tokenize("{var:30,list*,keys.a_b}").unwrap();
        assert_eq!(
            tokens,
            vec![Token::expression(
                Operator::Simple,
                vec![var("var").prefixed(30), var("list").exploded(), var("keys.a_b")]
            )]
        );
    }

    #[test]
    fn test_tokenize_pct_triplets() {
        let tokens = tokenize("/a%20b{x%2Ay}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::literal("/a%20b"),
                Token::expression(Operator::Simple, vec![var("x%2Ay")]),
            ]
        );
    }

    #[test]
    fn test_tokenize_unicode_literal() {
        assert_eq!(tokenize("/über").unwrap(), vec![Token::literal("/über")]);
    }

    #[test]
    fn test_tokenize_errors() {
        let position = |pattern: &str| match tokenize(pattern) {
            Err(TemplateError::Invalid { position, .. }) => position,
            other => panic!("expected syntax error for {:?}, got {:?}", pattern, other),
        };
        assert_eq!(position("/foo/{bar"), 5);
        assert_eq!(position("{}"), 0);
        assert_eq!(position("a b"), 1);
        assert_eq!(position("{a.}"), 0);
        assert_eq!(position("{.a..b}"), 0);
        assert_eq!(position("{a:1234567890}"), 0);
        assert_eq!(position("x{a:}"), 1);
        assert_eq!(position("{a*:3}"), 0);
        assert_eq!(position("{a:3*}"), 0);
        assert_eq!(position("%zz"), 0);
        assert_eq!(position("x}"), 1);
        assert_eq!(position("{=a}"), 0);
    }

    #[test]
    fn test_max_length_bounds() {
        assert!(tokenize("{a:9999}").is_ok());
        assert!(tokenize("{a:1}").is_ok());
        assert_eq!(
            tokenize("{a:10000}").unwrap(),
            vec![Token::expression(Operator::Simple, vec![var("a").prefixed(10000)])]
        );
        assert_eq!(
            tokenize("{a:999999999}").unwrap(),
            vec![Token::expression(Operator::Simple, vec![var("a").prefixed(999_999_999)])]
        );
    }

    #[test]
    fn test_zero_max_length_is_no_prefix() {
        assert_eq!(
            tokenize("{a:0}").unwrap(),
            vec![Token::expression(Operator::Simple, vec![var("a")])]
        );
        assert_eq!(
            tokenize("{a:007}").unwrap(),
            vec![Token::expression(Operator::Simple, vec![var("a").prefixed(7)])]
        );
    }

    #[test]
    fn test_is_valid_agrees() {
        for pattern in [
            "",
            "/foo",
            "{var}",
            "{+a,b:3}/x{#c*}",
            "{?a.b%20c}",
            "http://example.com/{;x,y}",
            "{a:9999}",
            "{a:0}",
            "{a:10000}",
            "{a:999999999}",
            "/ü",
            "%41",
        ] {
            assert!(is_valid(pattern), "{pattern}");
            assert!(tokenize(pattern).is_ok(), "{pattern}");
        }
        for pattern in [
            "{",
            "}",
            "{a",
            "{a.}",
            "{a:}",
            "{a:1234567890}",
            "a b",
            "%4",
            "{a*:1}",
            "<",
        ] {
            assert!(!is_valid(pattern), "{pattern}");
            assert!(tokenize(pattern).is_err(), "{pattern}");
        }
    }
}
