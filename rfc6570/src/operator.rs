//! The expression operators
//!
//! Each of the eight operators is fully described by one row of a constant
//! table. Expansion, matching, extraction and level computation all read the
//! row instead of branching on the operator.

use std::fmt;

use crate::ast::{ClassItem, Expr};

/// Characters that RFC 3986 allows anywhere without escaping
const UNRESERVED_PUNCT: [char; 4] = ['-', '.', '_', '~'];

/// gen-delims and sub-delims, except the comma
const RESERVED_PUNCT: [char; 17] = [
    ':', '/', '?', '#', '[', ']', '@', '!', '$', '&', '\'', '(', ')', '*', '+', ';', '=',
];

/// The set of characters an operator may emit unescaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alphabet {
    /// `ALPHA / DIGIT / "-" / "." / "_" / "~"`
    Unreserved,
    /// Unreserved plus reserved characters; pct-triplets pass through
    Reserved,
}

impl Alphabet {
    /// Whether `c` can appear unescaped in output of this alphabet
    pub fn allows(self, c: char) -> bool {
        let unreserved = c.is_ascii_alphanumeric() || UNRESERVED_PUNCT.contains(&c);
        match self {
            Alphabet::Unreserved => unreserved,
            Alphabet::Reserved => unreserved || c == ',' || RESERVED_PUNCT.contains(&c),
        }
    }

    /// Character class items of the alphabet, optionally with the comma
    pub fn class_items(self, comma: bool) -> Vec<ClassItem> {
        let mut items = vec![
            ClassItem::Range('A', 'Z'),
            ClassItem::Range('a', 'z'),
            ClassItem::Range('0', '9'),
        ];
        items.extend(UNRESERVED_PUNCT.iter().copied().map(ClassItem::Char));
        if self == Alphabet::Reserved {
            items.extend(RESERVED_PUNCT.iter().copied().map(ClassItem::Char));
        }
        if comma {
            items.push(ClassItem::Char(','));
        }
        items
    }

    /// One matching unit: an allowed character or a pct-triplet.
    ///
    /// The comma is part of the reserved alphabet, but sibling varspecs are
    /// separated by commas, so callers decide whether to include it.
    pub fn unit(self, comma: bool) -> Expr {
        Expr::alternation(vec![
            Expr::char_class(false, self.class_items(comma)),
            pct_triplet(),
        ])
    }
}

/// `%` HEXDIG HEXDIG
pub fn pct_triplet() -> Expr {
    Expr::sequence(vec![Expr::literal('%'), hex_digit(), hex_digit()])
}

fn hex_digit() -> Expr {
    Expr::char_class(
        false,
        vec![
            ClassItem::Range('0', '9'),
            ClassItem::Range('A', 'F'),
            ClassItem::Range('a', 'f'),
        ],
    )
}

/// The expansion rules of one operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    /// Emitted before the first item, only when something was emitted
    pub prefix: &'static str,
    /// Joins the items of one expression
    pub separator: char,
    /// Joins a name and its value
    pub connector: char,
    /// Whether items are emitted as `name=value`
    pub named: bool,
    /// Whether an empty named value still carries the connector
    pub pair_if_empty: bool,
    /// Joins the elements of a non-exploded list or assoc
    pub list_connector: char,
    /// Characters emitted without escaping
    pub alphabet: Alphabet,
    /// RFC 6570 level of a single-variable expression
    pub base_level: u8,
}

impl OperatorSpec {
    /// Whether the operator's own separator is part of its alphabet, making
    /// exploded runs ambiguous on re-split
    pub fn grabs_separator(&self) -> bool {
        self.alphabet.allows(self.separator)
    }
}

const fn row(
    prefix: &'static str,
    separator: char,
    named: bool,
    pair_if_empty: bool,
    alphabet: Alphabet,
    base_level: u8,
) -> OperatorSpec {
    OperatorSpec {
        prefix,
        separator,
        connector: '=',
        named,
        pair_if_empty,
        list_connector: ',',
        alphabet,
        base_level,
    }
}

static SIMPLE: OperatorSpec = row("", ',', false, true, Alphabet::Unreserved, 1);
static RESERVED: OperatorSpec = row("", ',', false, true, Alphabet::Reserved, 2);
static FRAGMENT: OperatorSpec = row("#", ',', false, true, Alphabet::Reserved, 2);
static LABEL: OperatorSpec = row(".", '.', false, true, Alphabet::Unreserved, 3);
static PATH: OperatorSpec = row("/", '/', false, true, Alphabet::Unreserved, 3);
static PATH_PARAMETERS: OperatorSpec = row(";", ';', true, false, Alphabet::Unreserved, 3);
static QUERY: OperatorSpec = row("?", '&', true, true, Alphabet::Unreserved, 3);
static QUERY_CONTINUATION: OperatorSpec = row("&", '&', true, true, Alphabet::Unreserved, 3);

/// An expression operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    /// `{var}`
    #[default]
    Simple,
    /// `{+var}`
    Reserved,
    /// `{#var}`
    Fragment,
    /// `{.var}`
    Label,
    /// `{/var}`
    Path,
    /// `{;var}`
    PathParameters,
    /// `{?var}`
    Query,
    /// `{&var}`
    QueryContinuation,
}

impl Operator {
    /// Every operator, in table order
    pub const ALL: [Operator; 8] = [
        Operator::Simple,
        Operator::Reserved,
        Operator::Fragment,
        Operator::Label,
        Operator::Path,
        Operator::PathParameters,
        Operator::Query,
        Operator::QueryContinuation,
    ];

    /// Look up the operator for the character following `{`
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Reserved),
            '#' => Some(Operator::Fragment),
            '.' => Some(Operator::Label),
            '/' => Some(Operator::Path),
            ';' => Some(Operator::PathParameters),
            '?' => Some(Operator::Query),
            '&' => Some(Operator::QueryContinuation),
            _ => None,
        }
    }

    /// The operator character, `None` for simple expressions
    pub fn symbol(self) -> Option<char> {
        match self {
            Operator::Simple => None,
            Operator::Reserved => Some('+'),
            Operator::Fragment => Some('#'),
            Operator::Label => Some('.'),
            Operator::Path => Some('/'),
            Operator::PathParameters => Some(';'),
            Operator::Query => Some('?'),
            Operator::QueryContinuation => Some('&'),
        }
    }

    /// The table row of this operator
    pub fn spec(self) -> &'static OperatorSpec {
        match self {
            Operator::Simple => &SIMPLE,
            Operator::Reserved => &RESERVED,
            Operator::Fragment => &FRAGMENT,
            Operator::Label => &LABEL,
            Operator::Path => &PATH,
            Operator::PathParameters => &PATH_PARAMETERS,
            Operator::Query => &QUERY,
            Operator::QueryContinuation => &QUERY_CONTINUATION,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.symbol() {
            Some(c) => write!(f, "{}", c),
            None => Ok(()),
        }
    }
}
