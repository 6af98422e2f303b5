//! RFC 6570 URI Templates
//!
//! Templates expand variables into URIs and, approximately, extract them
//! back out of URIs. Matching runs on a small built-in automaton engine that
//! explores each automaton state at most once per URI position, so
//! extraction never backtracks exponentially.
//!
//! ```
//! use std::collections::HashMap;
//! use rfc6570::{Template, Value};
//!
//! let template = Template::new("/users/{id}{?fields*}").unwrap();
//! let vars = HashMap::from([
//!     ("id", Value::from("42")),
//!     ("fields", Value::from(["name", "email"])),
//! ]);
//! let uri = template.expand(&vars).unwrap();
//! assert_eq!(uri, "/users/42?fields=name&fields=email");
//!
//! let extracted = template.extract(&uri).unwrap().unwrap();
//! assert_eq!(extracted["id"], Value::from("42"));
//! assert_eq!(extracted["fields"], Value::from(["name", "email"]));
//! ```

pub mod ast;
pub mod builder;
pub mod compose;
pub mod engine;
pub mod error;
pub mod escape;
pub mod expand;
pub mod extract;
pub mod lexer;
pub mod nfa;
pub mod operator;
pub mod template;
pub mod token;
pub mod value;

pub use engine::{Match, Regex};
pub use error::{Result, TemplateError};
pub use extract::{Extracted, Processing};
pub use lexer::tokenize;
pub use operator::{Alphabet, Operator, OperatorSpec};
pub use template::{Template, TemplateMatch, TemplateOptions};
pub use token::{Expression, Token, VariableSpec};
pub use value::{Value, Variables};
