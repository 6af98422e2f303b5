//! Path joining and static origin detection

use crate::operator::Operator;
use crate::token::Token;

/// What a template is known to start with, judged without expanding it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Origin {
    /// The template starts with `scheme:`
    pub scheme: bool,
    /// The template starts with `//authority`, possibly after a scheme
    pub host: bool,
}

/// Classify the beginning of a token sequence.
///
/// Expressions are stood in for by a placeholder character; reserved
/// expressions may expand to `scheme://host` themselves, so they stand in
/// for both. Scanning stops at the first single `/` or once a host is seen.
pub fn origin(tokens: &[Token]) -> Origin {
    let mut read = String::new();
    let mut origin = Origin::default();
    for token in tokens {
        match token {
            Token::Literal(text) => read.push_str(text),
            Token::Expression(expr) => {
                read.push('x');
                if expr.operator() == Operator::Reserved {
                    read.push_str("://x");
                }
            }
        }
        if scheme_len(&read).is_some() {
            origin.scheme = true;
        }
        if has_host(&read) {
            origin.host = true;
            break;
        }
        if has_single_slash(&read) {
            break;
        }
    }
    origin
}

/// Length of a leading `[a-z]+:`
fn scheme_len(s: &str) -> Option<usize> {
    let letters = s.bytes().take_while(u8::is_ascii_alphabetic).count();
    (letters > 0 && s.as_bytes().get(letters) == Some(&b':')).then_some(letters + 1)
}

/// `([a-z]+:)?//[^/]+` at the start
fn has_host(s: &str) -> bool {
    let rest = scheme_len(s).map_or(s, |len| &s[len..]);
    rest.strip_prefix("//")
        .and_then(|authority| authority.chars().next())
        .is_some_and(|c| c != '/')
}

/// A `/` that is neither preceded by `:` or `/` nor followed by `/`
fn has_single_slash(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'/'
            && (i == 0 || !matches!(bytes[i - 1], b':' | b'/'))
            && bytes.get(i + 1) != Some(&b'/')
    })
}

/// Join two token sequences with exactly one `/` between them
pub fn join(left: &[Token], right: &[Token]) -> Vec<Token> {
    let (Some(last), Some(first)) = (left.last(), right.first()) else {
        return if left.is_empty() {
            right.to_vec()
        } else {
            left.to_vec()
        };
    };

    let mut tokens: Vec<Token> = left[..left.len() - 1].to_vec();
    let rest = &right[1..];
    let starts_path = |token: &Token| {
        token
            .as_expression()
            .is_some_and(|expr| expr.operator() == Operator::Path)
    };

    match (last, first) {
        (Token::Literal(l), _) if l.ends_with('/') => match first {
            Token::Literal(r) => {
                let r = r.strip_prefix('/').unwrap_or(r);
                tokens.push(Token::Literal(format!("{}{}", l, r)));
            }
            _ if starts_path(first) => {
                let stripped = &l[..l.len() - 1];
                if !stripped.is_empty() {
                    tokens.push(Token::literal(stripped));
                }
                tokens.push(first.clone());
            }
            _ => {
                tokens.push(last.clone());
                tokens.push(first.clone());
            }
        },
        (Token::Literal(l), Token::Literal(r)) => {
            let glue = if r.starts_with('/') { "" } else { "/" };
            tokens.push(Token::Literal(format!("{}{}{}", l, glue, r)));
        }
        _ => {
            tokens.push(last.clone());
            match first {
                Token::Literal(r) if !r.starts_with('/') => {
                    tokens.push(Token::Literal(format!("/{}", r)));
                }
                _ if first.as_literal().is_some() || starts_path(first) => {
                    tokens.push(first.clone());
                }
                _ => {
                    tokens.push(Token::literal("/"));
                    tokens.push(first.clone());
                }
            }
        }
    }
    tokens.extend_from_slice(rest);
    tokens
}
