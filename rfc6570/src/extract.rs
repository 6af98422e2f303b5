//! Variable extraction
//!
//! Turns the capture slots of a template match back into values. This is
//! the approximate inverse of expansion: for every string produced by
//! expanding a template, expanding the extracted values gives the same
//! string again.

use std::collections::HashMap;
use std::ops::BitOr;

use crate::builder::{UNIT_KEY, UNIT_TAIL, UNIT_VALUE, unit_pattern};
use crate::engine::Match;
use crate::escape::decode;
use crate::operator::Operator;
use crate::token::{Token, VariableSpec};
use crate::value::Value;

/// Post-processing applied to extracted variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Processing {
    convert_values: bool,
    convert_result: bool,
}

impl Processing {
    /// Raw `(name, value)` pairs in template order, duplicates kept
    pub const NONE: Processing = Processing {
        convert_values: false,
        convert_result: false,
    };
    /// Fold duplicate keys inside assoc values
    pub const CONVERT_VALUES: Processing = Processing {
        convert_values: true,
        convert_result: false,
    };
    /// Fold the pairs into a map, the last occurrence of a name wins
    pub const CONVERT_RESULT: Processing = Processing {
        convert_values: false,
        convert_result: true,
    };
    /// Both conversions
    pub const DEFAULT: Processing = Processing {
        convert_values: true,
        convert_result: true,
    };

    pub fn converts_values(self) -> bool {
        self.convert_values
    }

    pub fn converts_result(self) -> bool {
        self.convert_result
    }
}

impl Default for Processing {
    fn default() -> Self {
        Processing::DEFAULT
    }
}

impl BitOr for Processing {
    type Output = Processing;

    fn bitor(self, rhs: Processing) -> Processing {
        Processing {
            convert_values: self.convert_values || rhs.convert_values,
            convert_result: self.convert_result || rhs.convert_result,
        }
    }
}

/// Extracted variables, shaped by [`Processing`]
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// Ordered pairs, one per varspec
    Pairs(Vec<(String, Value)>),
    /// One entry per variable name
    Map(HashMap<String, Value>),
}

impl Extracted {
    /// The value of `name`; for pairs the last occurrence
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Extracted::Pairs(pairs) => pairs.iter().rev().find(|(n, _)| n == name).map(|(_, v)| v),
            Extracted::Map(map) => map.get(name),
        }
    }

    /// Fold into a map, the last occurrence of a name wins
    pub fn into_map(self) -> HashMap<String, Value> {
        match self {
            Extracted::Pairs(pairs) => pairs.into_iter().collect(),
            Extracted::Map(map) => map,
        }
    }

    pub fn into_pairs(self) -> Option<Vec<(String, Value)>> {
        match self {
            Extracted::Pairs(pairs) => Some(pairs),
            Extracted::Map(_) => None,
        }
    }
}

/// Decode the captures of `m` into `(name, value)` pairs in template order
pub fn extract_pairs(tokens: &[Token], m: &Match, input: &str) -> Vec<(String, Value)> {
    let mut pairs = Vec::new();
    let mut slot = 0;
    for expr in tokens.iter().filter_map(Token::as_expression) {
        for var in expr.variables() {
            let value = match m.group_str(input, slot) {
                None => Value::Undefined,
                Some(captured) => decode_capture(expr.operator(), var, captured),
            };
            pairs.push((var.name.clone(), value));
            slot += 1;
        }
    }
    pairs
}

/// Apply the requested post-processing
pub fn process(pairs: Vec<(String, Value)>, processing: Processing) -> Extracted {
    let pairs: Vec<(String, Value)> = if processing.converts_values() {
        pairs
            .into_iter()
            .map(|(name, value)| (name, value.fold_duplicate_keys()))
            .collect()
    } else {
        pairs
    };
    if processing.converts_result() {
        Extracted::Map(pairs.into_iter().collect())
    } else {
        Extracted::Pairs(pairs)
    }
}

fn decode_capture(operator: Operator, var: &VariableSpec, captured: &str) -> Value {
    let spec = operator.spec();
    if var.explode {
        resplit(operator, var, captured)
    } else if spec.named {
        match captured.strip_prefix(spec.connector) {
            Some(value) => split_decode(value),
            None => Value::Scalar(String::new()),
        }
    } else {
        split_decode(captured)
    }
}

/// Split a non-exploded capture on every comma and decode each segment.
/// This undoes the comma join of list and assoc expansion, empty items
/// included: `a,,b` is `["a", "", "b"]`.
pub fn split_decode(captured: &str) -> Value {
    let mut segments: Vec<String> = captured
        .split(',')
        .map(|segment| decode(segment).into_owned())
        .collect();
    if segments.len() == 1 {
        Value::Scalar(segments.remove(0))
    } else {
        Value::List(segments)
    }
}

/// Split an exploded run into raw `(key, value)` units
fn split_units(operator: Operator, run: &str) -> Vec<(Option<&str>, String)> {
    if run.is_empty() {
        return vec![(None, String::new())];
    }
    let grabs_separator = operator.spec().grabs_separator();
    let mut units = Vec::new();
    let mut consumed = 0;

    for m in unit_pattern(operator).find_contiguous(run) {
        let key = m.group_str(run, UNIT_KEY);
        let mut value = m.group_str(run, UNIT_VALUE).unwrap_or("").to_string();
        let tail = m.group_str(run, UNIT_TAIL).unwrap_or("");
        let trailing = m.end == run.len() && !tail.is_empty();
        if trailing && grabs_separator {
            value.push_str(tail);
        }
        units.push((key, value));
        if trailing && !grabs_separator {
            units.push((None, String::new()));
        }
        consumed = m.end;
    }
    if consumed < run.len() {
        let rest = &run[consumed..];
        tracing::debug!(
            target: "rfc6570::extract",
            operator = %operator,
            rest = rest,
            "Exploded run could not be re-split, keeping the rest as one value"
        );
        units.push((None, rest.to_string()));
    }

    tracing::trace!(
        target: "rfc6570::extract",
        run = run,
        units = units.len(),
        "Re-split exploded run"
    );
    units
}

/// Rebuild a list or assoc from an exploded run
fn resplit(operator: Operator, var: &VariableSpec, run: &str) -> Value {
    let units = split_units(operator, run);
    let decoded = |s: &str| decode(s).into_owned();

    if operator.spec().named {
        if units.iter().all(|(key, _)| *key == Some(var.name.as_str())) {
            Value::List(units.iter().map(|(_, v)| decoded(v)).collect())
        } else {
            Value::Assoc(
                units
                    .iter()
                    .map(|(k, v)| (decoded(k.unwrap_or("")), decoded(v)))
                    .collect(),
            )
        }
    } else if units.iter().any(|(key, _)| key.is_some()) {
        let spec = operator.spec();
        let mut pairs: Vec<(&str, String)> = Vec::with_capacity(units.len());
        for (key, value) in &units {
            if let Some(key) = *key {
                pairs.push((key, value.clone()));
            } else if let Some((_, last)) = pairs.last_mut().filter(|_| spec.grabs_separator()) {
                // the previous value held an unescaped separator
                last.push(spec.separator);
                last.push_str(value);
            } else {
                pairs.push((value.as_str(), String::new()));
            }
        }
        Value::Assoc(
            pairs
                .into_iter()
                .map(|(k, v)| (decoded(k), decoded(&v)))
                .collect(),
        )
    } else {
        Value::List(units.iter().map(|(_, v)| decoded(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_split_decode() {
        assert_eq!(split_decode(""), Value::from(""));
        assert_eq!(split_decode("a%20b"), Value::from("a b"));
        assert_eq!(split_decode("a,b"), list(&["a", "b"]));
        assert_eq!(split_decode("a,,b"), list(&["a", "", "b"]));
        assert_eq!(split_decode("a,,,b"), list(&["a", "", "", "b"]));
        assert_eq!(split_decode("a,,"), list(&["a", "", ""]));
        assert_eq!(split_decode("a,"), list(&["a", ""]));
        assert_eq!(split_decode(",a"), list(&["", "a"]));
        assert_eq!(split_decode(","), list(&["", ""]));
    }

    #[test]
    fn test_split_decode_lenient_percent() {
        assert_eq!(split_decode("100%"), Value::from("100%"));
        assert_eq!(split_decode("%zz,%41"), list(&["%zz", "A"]));
    }

    #[test]
    fn test_resplit_unnamed() {
        let var = VariableSpec::new("list").exploded();
        assert_eq!(
            resplit(Operator::Path, &var, "red/green/blue"),
            list(&["red", "green", "blue"])
        );
        assert_eq!(resplit(Operator::Path, &var, "a/"), list(&["a", ""]));
        assert_eq!(resplit(Operator::Simple, &var, ""), list(&[""]));
        assert_eq!(
            resplit(Operator::Simple, &var, "semi=%3B,dot=."),
            Value::from(vec![("semi", ";"), ("dot", ".")])
        );
        assert_eq!(
            resplit(Operator::Simple, &var, "a=1,b"),
            Value::from(vec![("a", "1"), ("b", "")])
        );
    }

    #[test]
    fn test_resplit_grabbing_separator() {
        let var = VariableSpec::new("list").exploded();
        assert_eq!(resplit(Operator::Label, &var, "a..b"), list(&["a.", "b"]));
        assert_eq!(resplit(Operator::Label, &var, "a."), list(&["a."]));
        assert_eq!(resplit(Operator::Reserved, &var, "a,,b"), list(&["a,", "b"]));
    }

    #[test]
    fn test_resplit_keyless_unit_joins_previous_value() {
        let var = VariableSpec::new("keys").exploded();
        assert_eq!(
            resplit(Operator::Fragment, &var, "a=1,2,b="),
            Value::from(vec![("a", "1,2"), ("b", "")])
        );
        assert_eq!(
            resplit(Operator::Label, &var, "a=1.2"),
            Value::from(vec![("a", "1.2")])
        );
        assert_eq!(
            resplit(Operator::Reserved, &var, "x,a=1"),
            Value::from(vec![("x", ""), ("a", "1")])
        );
    }

    #[test]
    fn test_resplit_long_run() {
        let var = VariableSpec::new("list").exploded();
        let run = vec!["item"; 5000].join("/");
        let Value::List(items) = resplit(Operator::Path, &var, &run) else {
            panic!("expected a list");
        };
        assert_eq!(items.len(), 5000);
        assert!(items.iter().all(|item| item == "item"));
    }

    #[test]
    fn test_resplit_named() {
        let var = VariableSpec::new("list").exploded();
        assert_eq!(
            resplit(Operator::Query, &var, "list=a&list=b&list=c"),
            list(&["a", "b", "c"])
        );
        assert_eq!(
            resplit(Operator::Query, &var, "semi=%3B&dot=."),
            Value::from(vec![("semi", ";"), ("dot", ".")])
        );
        assert_eq!(
            resplit(Operator::PathParameters, &var, "list=a;list"),
            list(&["a", ""])
        );
    }

    #[test]
    fn test_processing_modes() {
        let pairs = vec![
            ("a".to_string(), Value::from("1")),
            ("k".to_string(), Value::from(vec![("x", "1"), ("x", "2")])),
            ("a".to_string(), Value::from("2")),
        ];

        let raw = process(pairs.clone(), Processing::NONE);
        assert_eq!(raw, Extracted::Pairs(pairs.clone()));
        assert_eq!(raw.get("a"), Some(&Value::from("2")));

        let values = process(pairs.clone(), Processing::CONVERT_VALUES);
        let values = values.into_pairs().unwrap();
        assert_eq!(values[1].1, Value::from(vec![("x", "2")]));

        let map = process(pairs.clone(), Processing::CONVERT_RESULT).into_map();
        assert_eq!(map["a"], Value::from("2"));
        assert_eq!(map["k"], Value::from(vec![("x", "1"), ("x", "2")]));

        assert_eq!(
            Processing::CONVERT_VALUES | Processing::CONVERT_RESULT,
            Processing::DEFAULT
        );
        assert_eq!(Processing::default(), Processing::DEFAULT);
    }
}
