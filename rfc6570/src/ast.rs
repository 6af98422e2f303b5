//! Regex IR used to describe template matchers
//!
//! Matchers are never written as regex source text. The builder assembles
//! these nodes directly and the NFA compiler consumes them. The `Display`
//! rendering exists for inspection and tests only.
//!
//! Supported constructs:
//! - Literals and character classes
//! - Greedy and lazy quantifiers (*, +, ?, {n,m})
//! - Non-capturing groups and captures into numbered slots
//! - Alternation (|)
//! - Anchors (\A, \z)
//! - Positive and negative lookahead

use std::fmt;

/// An expression in the IR
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Empty expression (matches empty string)
    Empty,

    /// A literal character
    Literal(char),

    /// A sequence of expressions (concatenation)
    Sequence(Vec<Expr>),

    /// Alternation, earlier branches have priority
    Alternation(Vec<Expr>),

    /// A character class `[abc]`, `[^abc]` or `[a-z]`
    CharacterClass(CharacterClass),

    /// Quantified expression (e.g., a*, a+?, a?, a{0,5})
    Quantified {
        /// The expression being quantified
        expr: Box<Expr>,
        /// The quantifier
        quantifier: Quantifier,
    },

    /// A non-capturing group: (?:...)
    NonCapturingGroup(Box<Expr>),

    /// A capture into `slot`. Several captures may share one slot when
    /// they sit in different branches of an alternation.
    Capture {
        /// The capture slot (0-based)
        slot: usize,
        /// The captured pattern
        expr: Box<Expr>,
    },

    /// Start of input anchor (\A)
    StartAnchor,

    /// End of input anchor (\z)
    EndAnchor,

    /// Positive lookahead assertion (?=...)
    Lookahead(Box<Expr>),

    /// Negative lookahead assertion (?!...)
    NegativeLookahead(Box<Expr>),
}

/// A character class
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterClass {
    /// Whether the class is negated [^...]
    pub negated: bool,
    /// The items in the class
    pub items: Vec<ClassItem>,
}

/// An item in a character class
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassItem {
    /// A single character
    Char(char),
    /// A character range (e.g., a-z)
    Range(char, char),
    /// Any Unicode whitespace (\s)
    Whitespace,
}

/// A quantifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantifier {
    /// Zero or more (*)
    ZeroOrMore,
    /// Zero or more lazy (*?)
    ZeroOrMoreLazy,
    /// One or more (+)
    OneOrMore,
    /// One or more lazy (+?)
    OneOrMoreLazy,
    /// Zero or one (?)
    Optional,
    /// Exactly n times ({n})
    Exactly(u32),
    /// Between n and m times ({n,m})
    Between(u32, u32),
    /// Between n and m times lazy ({n,m}?)
    BetweenLazy(u32, u32),
}

impl Expr {
    /// Create a literal expression
    pub fn literal(c: char) -> Self {
        Expr::Literal(c)
    }

    /// Create a sequence of literals from a string
    pub fn literal_str(s: &str) -> Self {
        Expr::sequence(s.chars().map(Expr::Literal).collect())
    }

    /// Create a sequence from a vector of expressions
    pub fn sequence(exprs: Vec<Expr>) -> Self {
        let mut exprs: Vec<Expr> = exprs
            .into_iter()
            .filter(|e| !matches!(e, Expr::Empty))
            .collect();
        match exprs.len() {
            0 => Expr::Empty,
            1 => exprs.remove(0),
            _ => Expr::Sequence(exprs),
        }
    }

    /// Create an alternation from a vector of expressions
    pub fn alternation(mut exprs: Vec<Expr>) -> Self {
        match exprs.len() {
            0 => Expr::Empty,
            1 => exprs.remove(0),
            _ => Expr::Alternation(exprs),
        }
    }

    /// Create a character class
    pub fn char_class(negated: bool, items: Vec<ClassItem>) -> Self {
        Expr::CharacterClass(CharacterClass { negated, items })
    }

    /// Create a quantified expression
    pub fn quantified(expr: Expr, quantifier: Quantifier) -> Self {
        Expr::Quantified {
            expr: Box::new(expr),
            quantifier,
        }
    }

    /// Create an optional (greedy `?`) expression
    pub fn optional(expr: Expr) -> Self {
        Expr::quantified(expr, Quantifier::Optional)
    }

    /// Create a capture into the given slot
    pub fn capture(slot: usize, expr: Expr) -> Self {
        Expr::Capture {
            slot,
            expr: Box::new(expr),
        }
    }

    /// Create a non-capturing group
    pub fn non_capturing_group(expr: Expr) -> Self {
        Expr::NonCapturingGroup(Box::new(expr))
    }

    /// Create a start anchor (\A)
    pub fn start_anchor() -> Self {
        Expr::StartAnchor
    }

    /// Create an end anchor (\z)
    pub fn end_anchor() -> Self {
        Expr::EndAnchor
    }

    /// Create a positive lookahead
    pub fn lookahead(expr: Expr) -> Self {
        Expr::Lookahead(Box::new(expr))
    }

    /// Create a negative lookahead
    pub fn negative_lookahead(expr: Expr) -> Self {
        Expr::NegativeLookahead(Box::new(expr))
    }

    /// Number of capture slots referenced by this expression
    pub fn slot_count(&self) -> usize {
        match self {
            Expr::Capture { slot, expr } => (*slot + 1).max(expr.slot_count()),
            Expr::Sequence(exprs) | Expr::Alternation(exprs) => {
                exprs.iter().map(Expr::slot_count).max().unwrap_or(0)
            }
            Expr::Quantified { expr, .. }
            | Expr::NonCapturingGroup(expr)
            | Expr::Lookahead(expr)
            | Expr::NegativeLookahead(expr) => expr.slot_count(),
            _ => 0,
        }
    }

    /// Convert the IR to conventional regex syntax (for debugging)
    pub fn to_regex_string(&self) -> String {
        match self {
            Expr::Empty => String::new(),
            Expr::Literal(c) => escape_char(*c),
            Expr::Sequence(exprs) => exprs
                .iter()
                .map(|e| match e {
                    Expr::Alternation(_) => format!("(?:{})", e.to_regex_string()),
                    _ => e.to_regex_string(),
                })
                .collect(),
            Expr::Alternation(exprs) => {
                let parts: Vec<_> = exprs.iter().map(|e| e.to_regex_string()).collect();
                parts.join("|")
            }
            Expr::CharacterClass(cc) => cc.to_regex_string(),
            Expr::Quantified { expr, quantifier } => {
                let needs_parens = matches!(
                    expr.as_ref(),
                    Expr::Alternation(_) | Expr::Sequence(_) | Expr::Quantified { .. }
                );
                let expr_str = if needs_parens {
                    format!("(?:{})", expr.to_regex_string())
                } else {
                    expr.to_regex_string()
                };
                format!("{}{}", expr_str, quantifier)
            }
            Expr::NonCapturingGroup(expr) => format!("(?:{})", expr.to_regex_string()),
            Expr::Capture { expr, .. } => format!("({})", expr.to_regex_string()),
            Expr::StartAnchor => "\\A".to_string(),
            Expr::EndAnchor => "\\z".to_string(),
            Expr::Lookahead(expr) => format!("(?={})", expr.to_regex_string()),
            Expr::NegativeLookahead(expr) => format!("(?!{})", expr.to_regex_string()),
        }
    }
}

fn escape_char(c: char) -> String {
    if "\\.+*?()|[]{}^$#-".contains(c) {
        format!("\\{}", c)
    } else {
        c.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_regex_string())
    }
}

impl CharacterClass {
    /// Whether `c` is a member of this class
    pub fn matches(&self, c: char) -> bool {
        let matched = self.items.iter().any(|item| match *item {
            ClassItem::Char(ch) => ch == c,
            ClassItem::Range(start, end) => (start..=end).contains(&c),
            ClassItem::Whitespace => c.is_whitespace(),
        });
        if self.negated { !matched } else { matched }
    }

    fn to_regex_string(&self) -> String {
        let mut result = String::new();
        result.push('[');
        if self.negated {
            result.push('^');
        }
        for item in &self.items {
            match *item {
                ClassItem::Char(c) => result.push_str(&class_char(c)),
                ClassItem::Range(start, end) => {
                    result.push_str(&class_char(start));
                    result.push('-');
                    result.push_str(&class_char(end));
                }
                ClassItem::Whitespace => result.push_str("\\s"),
            }
        }
        result.push(']');
        result
    }
}

fn class_char(c: char) -> String {
    if c.is_control() {
        format!("\\x{{{:02X}}}", c as u32)
    } else if "\\]^-[".contains(c) {
        format!("\\{}", c)
    } else {
        c.to_string()
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantifier::ZeroOrMore => write!(f, "*"),
            Quantifier::ZeroOrMoreLazy => write!(f, "*?"),
            Quantifier::OneOrMore => write!(f, "+"),
            Quantifier::OneOrMoreLazy => write!(f, "+?"),
            Quantifier::Optional => write!(f, "?"),
            Quantifier::Exactly(n) => write!(f, "{{{}}}", n),
            Quantifier::Between(n, m) => write!(f, "{{{},{}}}", n, m),
            Quantifier::BetweenLazy(n, m) => write!(f, "{{{},{}}}?", n, m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_escaping() {
        assert_eq!(Expr::literal('a').to_regex_string(), "a");
        assert_eq!(Expr::literal('.').to_regex_string(), "\\.");
        assert_eq!(Expr::literal('?').to_regex_string(), "\\?");
        assert_eq!(Expr::literal_str("/x/").to_regex_string(), "/x/");
    }

    #[test]
    fn test_sequence_drops_empty() {
        let expr = Expr::sequence(vec![Expr::Empty, Expr::literal('a'), Expr::Empty]);
        assert_eq!(expr, Expr::literal('a'));
        assert_eq!(Expr::sequence(vec![]), Expr::Empty);
    }

    #[test]
    fn test_alternation() {
        let expr = Expr::alternation(vec![
            Expr::literal('a'),
            Expr::literal('b'),
            Expr::literal('c'),
        ]);
        assert_eq!(expr.to_regex_string(), "a|b|c");
    }

    #[test]
    fn test_alternation_inside_sequence_is_grouped() {
        let expr = Expr::sequence(vec![
            Expr::literal('x'),
            Expr::alternation(vec![Expr::literal('a'), Expr::literal('b')]),
        ]);
        assert_eq!(expr.to_regex_string(), "x(?:a|b)");
    }

    #[test]
    fn test_character_class() {
        let expr = Expr::char_class(
            false,
            vec![ClassItem::Range('a', 'z'), ClassItem::Char('-'), ClassItem::Char('_')],
        );
        assert_eq!(expr.to_regex_string(), "[a-z\\-_]");
    }

    #[test]
    fn test_character_class_matches() {
        let class = CharacterClass {
            negated: true,
            items: vec![ClassItem::Char('{'), ClassItem::Whitespace],
        };
        assert!(class.matches('a'));
        assert!(!class.matches('{'));
        assert!(!class.matches(' '));
        assert!(!class.matches('\u{3000}'));
    }

    #[test]
    fn test_quantifiers() {
        let q = |q| Expr::quantified(Expr::literal('a'), q).to_regex_string();
        assert_eq!(q(Quantifier::ZeroOrMore), "a*");
        assert_eq!(q(Quantifier::ZeroOrMoreLazy), "a*?");
        assert_eq!(q(Quantifier::OneOrMoreLazy), "a+?");
        assert_eq!(q(Quantifier::Optional), "a?");
        assert_eq!(q(Quantifier::Exactly(2)), "a{2}");
        assert_eq!(q(Quantifier::Between(0, 3)), "a{0,3}");
        assert_eq!(q(Quantifier::BetweenLazy(0, 3)), "a{0,3}?");
    }

    #[test]
    fn test_capture_and_lookahead() {
        let expr = Expr::sequence(vec![
            Expr::capture(0, Expr::literal('a')),
            Expr::negative_lookahead(Expr::literal(',')),
            Expr::lookahead(Expr::end_anchor()),
        ]);
        assert_eq!(expr.to_regex_string(), "(a)(?!,)(?=\\z)");
    }

    #[test]
    fn test_slot_count() {
        let expr = Expr::alternation(vec![
            Expr::capture(2, Expr::literal('a')),
            Expr::optional(Expr::capture(0, Expr::capture(1, Expr::literal('b')))),
        ]);
        assert_eq!(expr.slot_count(), 3);
        assert_eq!(Expr::literal('a').slot_count(), 0);
    }
}
