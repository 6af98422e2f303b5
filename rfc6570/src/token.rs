//! Template tokens
//!
//! A template is an ordered sequence of literal runs and `{...}` expressions.
//! Tokens never change after construction.

use std::fmt;

use crate::operator::{Operator, OperatorSpec};

/// One variable reference inside an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableSpec {
    /// The variable name, pct-triplets kept as written
    pub name: String,
    /// The `*` modifier
    pub explode: bool,
    /// The `:N` modifier, 0 when absent
    pub max_length: usize,
}

impl VariableSpec {
    /// A varspec without modifiers
    pub fn new(name: impl Into<String>) -> Self {
        VariableSpec {
            name: name.into(),
            explode: false,
            max_length: 0,
        }
    }

    /// The same varspec with the explode modifier
    pub fn exploded(mut self) -> Self {
        self.explode = true;
        self.max_length = 0;
        self
    }

    /// The same varspec with a prefix length
    pub fn prefixed(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self.explode = false;
        self
    }

    /// Whether the varspec carries `*` or `:N`
    pub fn has_modifier(&self) -> bool {
        self.explode || self.max_length > 0
    }
}

impl fmt::Display for VariableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.explode {
            f.write_str("*")
        } else if self.max_length > 0 {
            write!(f, ":{}", self.max_length)
        } else {
            Ok(())
        }
    }
}

/// An `{op var,var}` expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    operator: Operator,
    variables: Vec<VariableSpec>,
}

impl Expression {
    /// Create an expression; `variables` keeps its written order
    pub fn new(operator: Operator, variables: Vec<VariableSpec>) -> Self {
        Expression {
            operator,
            variables,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn spec(&self) -> &'static OperatorSpec {
        self.operator.spec()
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// RFC 6570 level of this expression
    pub fn level(&self) -> u8 {
        if self.variables.iter().any(VariableSpec::has_modifier) {
            4
        } else if self.variables.len() == 1 {
            self.spec().base_level
        } else {
            3
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.operator)?;
        for (i, var) in self.variables.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", var)?;
        }
        f.write_str("}")
    }
}

/// A template token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Literal text, already valid URI characters or pct-triplets
    Literal(String),
    /// A variable expression
    Expression(Expression),
}

impl Token {
    /// Shorthand for a literal token
    pub fn literal(text: impl Into<String>) -> Self {
        Token::Literal(text.into())
    }

    /// Shorthand for an expression token
    pub fn expression(operator: Operator, variables: Vec<VariableSpec>) -> Self {
        Token::Expression(Expression::new(operator, variables))
    }

    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Token::Literal(text) => Some(text),
            Token::Expression(_) => None,
        }
    }

    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Token::Literal(_) => None,
            Token::Expression(expr) => Some(expr),
        }
    }

    /// Literals count as level 1
    pub fn level(&self) -> u8 {
        match self {
            Token::Literal(_) => 1,
            Token::Expression(expr) => expr.level(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(text) => f.write_str(text),
            Token::Expression(expr) => write!(f, "{}", expr),
        }
    }
}
