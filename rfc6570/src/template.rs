//! The template type
//!
//! A [`Template`] is immutable. Its tokens, compiled matcher, variable list
//! and level are computed at most once and shared by clones.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Div;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use crate::builder::CompiledPattern;
use crate::compose::{self, Origin};
use crate::engine::Match;
use crate::error::{Result, TemplateError};
use crate::expand::expand;
use crate::extract::{Extracted, Processing, extract_pairs, process};
use crate::lexer::{is_valid, tokenize};
use crate::token::Token;
use crate::value::{Value, Variables};

/// Construction options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct TemplateOptions {
    /// Defer tokenizing until the template is first used
    pub lazy: bool,
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }
}

/// An RFC 6570 URI template
#[derive(Debug, Clone)]
pub struct Template {
    pattern: String,
    tokens: OnceLock<Result<Vec<Token>>>,
    compiled: OnceLock<Arc<CompiledPattern>>,
    variables: OnceLock<Vec<String>>,
}

/// A successful match of a URI against a template
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    compiled: Arc<CompiledPattern>,
    input: String,
    inner: Match,
}

impl TemplateMatch {
    /// The matched URI
    pub fn as_str(&self) -> &str {
        self.inner.as_str(&self.input)
    }

    /// Raw captured text of varspec `index`, counted across the template
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.inner.group_str(&self.input, index)
    }

    /// Number of capture slots
    pub fn len(&self) -> usize {
        self.compiled.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Template {
    /// Parse a template
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_options(pattern, TemplateOptions::default())
    }

    /// Parse a template with the given options. Lazy templates report
    /// syntax errors from their first use instead.
    pub fn with_options(pattern: &str, options: TemplateOptions) -> Result<Self> {
        let tokens = OnceLock::new();
        if !options.lazy {
            let _ = tokens.set(Ok(tokenize(pattern)?));
        }
        Ok(Template {
            pattern: pattern.to_string(),
            tokens,
            compiled: OnceLock::new(),
            variables: OnceLock::new(),
        })
    }

    /// Build a template from tokens without validating them
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let pattern = tokens.iter().map(Token::to_string).collect();
        Template {
            pattern,
            tokens: OnceLock::from(Ok(tokens)),
            compiled: OnceLock::new(),
            variables: OnceLock::new(),
        }
    }

    /// Whether `pattern` would parse, without building tokens
    pub fn is_valid(pattern: &str) -> bool {
        is_valid(pattern)
    }

    /// The template pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tokens(&self) -> Result<&[Token]> {
        self.tokens
            .get_or_init(|| tokenize(&self.pattern))
            .as_deref()
            .map_err(Clone::clone)
    }

    fn compiled(&self) -> Result<&Arc<CompiledPattern>> {
        let tokens = self.tokens()?;
        Ok(self
            .compiled
            .get_or_init(|| Arc::new(CompiledPattern::new(tokens))))
    }

    /// Variable names in order of first occurrence
    pub fn variables(&self) -> Result<&[String]> {
        let tokens = self.tokens()?;
        Ok(self.variables.get_or_init(|| {
            let mut names: Vec<String> = Vec::new();
            for var in tokens
                .iter()
                .filter_map(Token::as_expression)
                .flat_map(|expr| expr.variables())
            {
                if !names.contains(&var.name) {
                    names.push(var.name.clone());
                }
            }
            names
        }))
    }

    /// RFC 6570 level, 1 to 4
    pub fn level(&self) -> Result<u8> {
        Ok(self.tokens()?.iter().map(Token::level).max().unwrap_or(1))
    }

    /// Number of literal characters
    pub fn static_characters(&self) -> Result<usize> {
        Ok(self
            .tokens()?
            .iter()
            .filter_map(Token::as_literal)
            .map(|text| text.chars().count())
            .sum())
    }

    /// Expand the template
    pub fn expand<V: Variables + ?Sized>(&self, vars: &V) -> Result<String> {
        expand(self.tokens()?, vars)
    }

    /// Expand with variables taken from a JSON object
    #[cfg(feature = "json")]
    pub fn expand_json(&self, vars: &serde_json::Value) -> Result<String> {
        let object = match vars {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => return self.expand(&HashMap::<String, Value>::new()),
            other => {
                return Err(TemplateError::Unconvertable {
                    value: other.to_string(),
                });
            }
        };
        let mut values = HashMap::new();
        for name in self.variables()? {
            if let Some(value) = object.get(name) {
                values.insert(name.clone(), Value::from_json(value)?);
            }
        }
        self.expand(&values)
    }

    /// The compiled matcher in conventional regex syntax
    pub fn regex_source(&self) -> Result<String> {
        Ok(self.compiled()?.source().to_string())
    }

    /// Whether `uri` matches the template
    pub fn is_match(&self, uri: &str) -> Result<bool> {
        Ok(self.compiled()?.regex().is_match(uri))
    }

    /// Match `uri` against the template
    pub fn match_uri(&self, uri: &str) -> Result<Option<TemplateMatch>> {
        let compiled = self.compiled()?;
        Ok(compiled.regex().find(uri).map(|inner| TemplateMatch {
            compiled: Arc::clone(compiled),
            input: uri.to_string(),
            inner,
        }))
    }

    /// Extract the variables of `uri` with default processing
    pub fn extract(&self, uri: &str) -> Result<Option<HashMap<String, Value>>> {
        Ok(self
            .extract_with(Some(uri), Processing::DEFAULT)?
            .map(Extracted::into_map))
    }

    /// Extract the variables of `uri` as raw pairs in template order
    pub fn extract_simple(&self, uri: &str) -> Result<Option<Vec<(String, Value)>>> {
        Ok(self
            .extract_with(Some(uri), Processing::NONE)?
            .and_then(Extracted::into_pairs))
    }

    /// Extract with explicit processing; no input gives no result
    pub fn extract_with(
        &self,
        uri: Option<&str>,
        processing: Processing,
    ) -> Result<Option<Extracted>> {
        let Some(uri) = uri else {
            return Ok(None);
        };
        match self.match_uri(uri)? {
            Some(m) => self.extract_match(&m, processing).map(Some),
            None => {
                tracing::trace!(
                    target: "rfc6570::extract",
                    pattern = %self.pattern,
                    uri = uri,
                    "URI does not match template"
                );
                Ok(None)
            }
        }
    }

    /// Extract from a match produced by this template
    pub fn extract_match(&self, m: &TemplateMatch, processing: Processing) -> Result<Extracted> {
        if !Arc::ptr_eq(&m.compiled, self.compiled()?) {
            return Err(TemplateError::ForeignMatch);
        }
        let pairs = extract_pairs(self.tokens()?, &m.inner, &m.input);
        Ok(process(pairs, processing))
    }

    /// Join two templates as path segments. The right side must have
    /// neither a scheme nor a host.
    pub fn join(&self, other: &Template) -> Result<Template> {
        if other.is_scheme()? || other.is_host()? {
            return Err(TemplateError::AbsoluteTemplate {
                pattern: other.pattern.clone(),
            });
        }
        Ok(Template::from_tokens(compose::join(
            self.tokens()?,
            other.tokens()?,
        )))
    }

    fn origin(&self) -> Result<Origin> {
        Ok(compose::origin(self.tokens()?))
    }

    /// Whether the template starts with a scheme
    pub fn is_scheme(&self) -> Result<bool> {
        Ok(self.origin()?.scheme)
    }

    /// Whether the template starts with a host
    pub fn is_host(&self) -> Result<bool> {
        Ok(self.origin()?.host)
    }

    pub fn is_absolute(&self) -> Result<bool> {
        self.is_host()
    }

    pub fn is_relative(&self) -> Result<bool> {
        Ok(!self.is_absolute()?)
    }
}

impl Div for &Template {
    type Output = Result<Template>;

    fn div(self, rhs: &Template) -> Result<Template> {
        self.join(rhs)
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Template) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for Template {}

impl PartialEq<str> for Template {
    fn eq(&self, other: &str) -> bool {
        match Template::new(other) {
            Ok(other) => *self == other,
            Err(_) => false,
        }
    }
}

impl PartialEq<&str> for Template {
    fn eq(&self, other: &&str) -> bool {
        *self == **other
    }
}

impl Hash for Template {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.pattern.hash(state);
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        Template::new(s)
    }
}

impl TryFrom<&str> for Template {
    type Error = TemplateError;

    fn try_from(s: &str) -> Result<Self> {
        Template::new(s)
    }
}

impl TryFrom<String> for Template {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self> {
        Template::new(&s)
    }
}
