//! Error types for template parsing, expansion and extraction
//!
//! Errors are categorized by the phase that raises them: syntax errors while
//! tokenizing, value errors while expanding, and misuse of the API (foreign
//! match objects, absolute templates on the right of `/`).

use thiserror::Error;

use crate::value::Value;

/// The main error type for URI templates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// The pattern does not follow the template grammar
    #[error("invalid expression found in {pattern:?} at {position}: '{}'", rest(.pattern, .position))]
    Invalid {
        /// The pattern that failed to tokenize
        pattern: String,
        /// Byte offset of the first character that could not be scanned
        position: usize,
    },

    /// A value cannot be expanded by the varspec it is bound to
    #[error("the template variable {variable:?} has a length limit and cannot expand {value:?}")]
    InvalidValue {
        /// The variable name
        variable: String,
        /// The offending value
        value: Value,
    },

    /// A value has no string representation
    #[error("could not convert {value} to a parameter string")]
    Unconvertable {
        /// Debug rendering of the value
        value: String,
    },

    /// A match object from another template was passed to extraction
    #[error("trying to extract variables from a match that was not produced by this template")]
    ForeignMatch,

    /// The right-hand side of a path join carries a scheme or a host
    #[error("expected a relative template but got an absolute one: {pattern:?}")]
    AbsoluteTemplate {
        /// The absolute pattern
        pattern: String,
    },
}

fn rest<'a>(pattern: &'a str, position: &usize) -> &'a str {
    pattern.get(*position..).unwrap_or("")
}

impl TemplateError {
    /// Create a syntax error for `pattern` at byte offset `position`
    pub fn invalid(pattern: impl Into<String>, position: usize) -> Self {
        TemplateError::Invalid {
            pattern: pattern.into(),
            position,
        }
    }

    /// Whether this error was raised by the tokenizer
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, TemplateError::Invalid { .. })
    }
}

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;
