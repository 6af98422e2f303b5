//! Matcher construction
//!
//! Every template compiles into one anchored automaton with one capture slot
//! per varspec, numbered in template order. Expressions are optional as a
//! whole. Inside an expression there is one alternative per "first present
//! varspec", all alternatives sharing the same slots, so that any subset of
//! defined variables produces a matchable string.
//!
//! Commas separate sibling varspecs of the simple, reserved and fragment
//! operators and also join list items, so only the last unnamed varspec may
//! consume commas. Earlier ones match reluctantly over a class without the
//! comma.

use std::sync::LazyLock;

use crate::ast::{Expr, Quantifier};
use crate::engine::Regex;
use crate::operator::{Operator, OperatorSpec};
use crate::token::{Expression, Token, VariableSpec};

/// Builds the IR for one expression
pub struct RegexBuilder<'a> {
    expression: &'a Expression,
    spec: &'static OperatorSpec,
    first_slot: usize,
}

impl<'a> RegexBuilder<'a> {
    /// Varspec `i` of `expression` captures into slot `first_slot + i`
    pub fn new(expression: &'a Expression, first_slot: usize) -> Self {
        RegexBuilder {
            expression,
            spec: expression.spec(),
            first_slot,
        }
    }

    fn separator(&self) -> Expr {
        Expr::literal(self.spec.separator)
    }

    fn connector(&self) -> Expr {
        Expr::literal(self.spec.connector)
    }

    /// Units of the operator alphabet, repeated up to `max_length` times
    fn repeat(&self, comma: bool, max_length: usize, lazy: bool) -> Expr {
        let bound = u32::try_from(max_length).unwrap_or(u32::MAX);
        let quantifier = match (bound, lazy) {
            (0, false) => Quantifier::ZeroOrMore,
            (0, true) => Quantifier::ZeroOrMoreLazy,
            (n, false) => Quantifier::Between(0, n),
            (n, true) => Quantifier::BetweenLazy(0, n),
        };
        Expr::quantified(self.spec.alphabet.unit(comma), quantifier)
    }

    /// A key of an exploded assoc: one or more units, shortest first
    fn key(&self) -> Expr {
        Expr::quantified(self.spec.alphabet.unit(false), Quantifier::OneOrMoreLazy)
    }

    /// The value class of one exploded unit
    fn explode_value(&self) -> Expr {
        let comma = self.spec.named || self.spec.alphabet.allows(',');
        self.repeat(comma, 0, false)
    }

    /// One item of an exploded run
    fn explode_unit(&self) -> Expr {
        if self.spec.named {
            let value = Expr::sequence(vec![self.connector(), self.explode_value()]);
            let value = if self.spec.pair_if_empty {
                value
            } else {
                Expr::optional(value)
            };
            Expr::sequence(vec![self.key(), value])
        } else {
            Expr::sequence(vec![
                Expr::optional(Expr::sequence(vec![self.key(), self.connector()])),
                self.explode_value(),
            ])
        }
    }

    /// `unit (sep unit)*`
    fn separated_list(&self, unit: Expr) -> Expr {
        Expr::sequence(vec![
            unit.clone(),
            Expr::quantified(
                Expr::sequence(vec![self.separator(), unit]),
                Quantifier::ZeroOrMore,
            ),
        ])
    }

    /// The pattern of varspec `index`, including the leading separator when
    /// it isn't the first one matched
    fn varspec(&self, index: usize, var: &VariableSpec, leading: bool) -> Expr {
        let slot = self.first_slot + index;
        let last = index + 1 == self.expression.variables().len();
        let sep = if leading { Expr::Empty } else { self.separator() };

        if var.explode {
            return Expr::sequence(vec![
                sep,
                Expr::capture(slot, self.separated_list(self.explode_unit())),
            ]);
        }
        if self.spec.named {
            let value = Expr::sequence(vec![
                self.connector(),
                self.repeat(true, var.max_length, false),
            ]);
            let value = if self.spec.pair_if_empty {
                value
            } else {
                Expr::alternation(vec![value, Expr::Empty])
            };
            return Expr::sequence(vec![
                sep,
                Expr::literal_str(&var.name),
                Expr::capture(slot, value),
            ]);
        }
        let value = if last {
            self.repeat(true, var.max_length, false)
        } else {
            self.repeat(false, var.max_length, true)
        };
        Expr::sequence(vec![sep, Expr::capture(slot, value)])
    }

    /// `(?:prefix (?: v0 (sep v1)? ... | v1 (sep v2)? ... | ...))?`
    pub fn build(&self) -> Expr {
        let variables = self.expression.variables();
        let branches = (0..variables.len())
            .map(|first| {
                let mut parts = vec![self.varspec(first, &variables[first], true)];
                for (index, var) in variables.iter().enumerate().skip(first + 1) {
                    parts.push(Expr::optional(self.varspec(index, var, false)));
                }
                Expr::sequence(parts)
            })
            .collect();
        Expr::optional(Expr::sequence(vec![
            Expr::literal_str(self.spec.prefix),
            Expr::non_capturing_group(Expr::alternation(branches)),
        ]))
    }
}

/// The compiled matcher of a template
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    source: String,
    slots: usize,
}

impl CompiledPattern {
    /// Compile a token sequence
    pub fn new(tokens: &[Token]) -> Self {
        let ir = template_ir(tokens);
        let source = ir.to_regex_string();
        let regex = Regex::from_expr(&ir);
        let slots = regex.slots();
        tracing::debug!(
            target: "rfc6570::builder",
            slots = slots,
            states = regex.state_count(),
            source = %source,
            "Compiled template matcher"
        );
        CompiledPattern {
            regex,
            source,
            slots,
        }
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The matcher in conventional regex syntax
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of capture slots, one per varspec
    pub fn slots(&self) -> usize {
        self.slots
    }
}

/// `\A token* \z`
pub fn template_ir(tokens: &[Token]) -> Expr {
    let mut parts = vec![Expr::start_anchor()];
    let mut slot = 0;
    for token in tokens {
        match token {
            Token::Literal(text) => parts.push(Expr::literal_str(text)),
            Token::Expression(expr) => {
                parts.push(RegexBuilder::new(expr, slot).build());
                slot += expr.variables().len();
            }
        }
    }
    parts.push(Expr::end_anchor());
    Expr::sequence(parts)
}

/// Slot of the key, value and tail in a unit pattern
pub const UNIT_KEY: usize = 0;
pub const UNIT_VALUE: usize = 1;
pub const UNIT_TAIL: usize = 2;

/// `(key=)? value (\z | sep)` for one item of an exploded run, matched back
/// to back with [`Regex::find_contiguous`]. Operators whose value class
/// contains the separator only stop at a separator that isn't doubled.
fn unit_ir(operator: Operator) -> Expr {
    let spec = operator.spec();
    let key = Expr::capture(
        UNIT_KEY,
        Expr::quantified(spec.alphabet.unit(false), Quantifier::OneOrMoreLazy),
    );
    let value_class = spec.alphabet.unit(spec.named || spec.alphabet.allows(','));
    let value = Expr::capture(
        UNIT_VALUE,
        Expr::quantified(value_class, Quantifier::ZeroOrMoreLazy),
    );
    let connector = Expr::literal(spec.connector);

    let head = if spec.named {
        Expr::sequence(vec![key, Expr::optional(Expr::sequence(vec![connector, value]))])
    } else {
        Expr::sequence(vec![Expr::optional(Expr::sequence(vec![key, connector])), value])
    };
    let separator = Expr::literal(spec.separator);
    let stop = if spec.grabs_separator() {
        Expr::sequence(vec![separator.clone(), Expr::negative_lookahead(separator)])
    } else {
        separator
    };
    Expr::sequence(vec![
        head,
        Expr::capture(UNIT_TAIL, Expr::alternation(vec![Expr::end_anchor(), stop])),
    ])
}

static UNIT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    Operator::ALL
        .iter()
        .map(|op| Regex::from_expr(&unit_ir(*op)))
        .collect()
});

/// The re-split pattern for exploded runs of `operator`
pub fn unit_pattern(operator: Operator) -> &'static Regex {
    &UNIT_PATTERNS[operator as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn compile(pattern: &str) -> CompiledPattern {
        CompiledPattern::new(&tokenize(pattern).unwrap())
    }

    fn groups(pattern: &str, input: &str) -> Option<Vec<Option<String>>> {
        let compiled = compile(pattern);
        let m = compiled.regex().find(input)?;
        Some(
            (0..compiled.slots())
                .map(|i| m.group_str(input, i).map(str::to_string))
                .collect(),
        )
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_literal_template() {
        let compiled = compile("/foo.bar");
        assert_eq!(compiled.source(), r"\A/foo\.bar\z");
        assert!(compiled.regex().is_match("/foo.bar"));
        assert!(!compiled.regex().is_match("/fooxbar"));
    }

    #[test]
    fn test_simple_expression_source() {
        assert_eq!(
            compile("{var}").source(),
            r"\A(?:((?:[A-Za-z0-9\-._~,]|%[0-9A-Fa-f][0-9A-Fa-f])*))?\z"
        );
    }

    #[test]
    fn test_slots_in_template_order() {
        assert_eq!(compile("{a,b}/{c}{?d*}").slots(), 4);
    }

    #[test]
    fn test_only_last_unnamed_takes_commas() {
        assert_eq!(
            groups("{x,y}", "1024,768,5"),
            Some(vec![some("1024"), some("768,5")])
        );
        assert_eq!(groups("{x,y}", "1024"), Some(vec![some("1024"), None]));
    }

    #[test]
    fn test_named_with_leading_undefined() {
        assert_eq!(groups("{?x,y}", "?y=768"), Some(vec![None, some("=768")]));
        assert_eq!(
            groups("{?x,y}", "?x=1&y=2"),
            Some(vec![some("=1"), some("=2")])
        );
        assert_eq!(groups("{;x,y}", ";y"), Some(vec![None, some("")]));
    }

    #[test]
    fn test_explode_run_is_one_capture() {
        assert_eq!(
            groups("{/list*}", "/red/green/blue"),
            Some(vec![some("red/green/blue")])
        );
        assert_eq!(
            groups("{?keys*}", "?semi=%3B&dot=."),
            Some(vec![some("semi=%3B&dot=.")])
        );
        assert_eq!(groups("{?list*}", "?a&b&c"), None);
    }

    #[test]
    fn test_prefix_length_bounds_capture() {
        assert_eq!(groups("{var:3}", "val"), Some(vec![some("val")]));
        assert_eq!(groups("{var:3}", "valu"), None);
        assert_eq!(groups("{var:2}", "%20a"), Some(vec![some("%20a")]));
    }

    #[test]
    fn test_large_prefix_stays_small() {
        let small = compile("{var:3}");
        let large = compile("{var:100000}");
        assert!(small.source().contains("{0,3}"));
        assert!(large.source().contains("{0,100000}"));
        assert_eq!(large.regex().state_count(), small.regex().state_count());

        let value = "a".repeat(2000);
        assert_eq!(groups("{var:100000}", &value), Some(vec![Some(value.clone())]));
        assert_eq!(groups("{var:1999}", &value), None);
    }

    #[test]
    fn test_unit_pattern_separator_handling() {
        let label = unit_pattern(Operator::Label);
        let m = label.find("a..b").unwrap();
        assert_eq!(m.group_str("a..b", UNIT_VALUE), Some("a."));
        assert_eq!(m.group_str("a..b", UNIT_TAIL), Some("."));

        let path = unit_pattern(Operator::Path);
        let m = path.find("a/b").unwrap();
        assert_eq!(m.group_str("a/b", UNIT_KEY), None);
        assert_eq!(m.group_str("a/b", UNIT_VALUE), Some("a"));
        assert_eq!(m.end, 2);

        let query = unit_pattern(Operator::Query);
        let m = query.find("k=v&x=y").unwrap();
        assert_eq!(m.group_str("k=v&x=y", UNIT_KEY), Some("k"));
        assert_eq!(m.group_str("k=v&x=y", UNIT_VALUE), Some("v"));
    }
}
