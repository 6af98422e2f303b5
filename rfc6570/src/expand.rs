//! Template expansion

use crate::error::{Result, TemplateError};
use crate::escape::{cut, encode};
use crate::operator::OperatorSpec;
use crate::token::{Expression, Token, VariableSpec};
use crate::value::{Value, Variables};

/// Expand a token sequence with the given variables
pub fn expand<V: Variables + ?Sized>(tokens: &[Token], vars: &V) -> Result<String> {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Expression(expr) => expand_expression(expr, vars, &mut out)?,
        }
    }
    Ok(out)
}

/// Expand one expression, appending to `out`
pub fn expand_expression<V: Variables + ?Sized>(
    expr: &Expression,
    vars: &V,
    out: &mut String,
) -> Result<()> {
    let spec = expr.spec();
    let mut items = Vec::new();

    for var in expr.variables() {
        let Some(value) = vars.lookup(&var.name) else {
            continue;
        };
        match value {
            Value::Undefined => {}
            Value::Scalar(s) => items.push(scalar_item(spec, var, s)),
            Value::List(_) | Value::Assoc(_) if var.max_length > 0 => {
                return Err(TemplateError::InvalidValue {
                    variable: var.name.clone(),
                    value: value.clone(),
                });
            }
            Value::List(list) => {
                if list.is_empty() {
                    continue;
                }
                let escaped = list.iter().map(|v| encode(v, spec.alphabet));
                if var.explode {
                    if spec.named {
                        items.extend(escaped.map(|v| pair(spec, &var.name, v)));
                    } else {
                        items.extend(escaped);
                    }
                } else {
                    items.push(joined(spec, var, escaped));
                }
            }
            Value::Assoc(pairs) => {
                if pairs.is_empty() {
                    continue;
                }
                if var.explode {
                    items.extend(pairs.iter().map(|(k, v)| {
                        pair(spec, &encode(k, spec.alphabet), encode(v, spec.alphabet))
                    }));
                } else {
                    let flat = pairs
                        .iter()
                        .flat_map(|(k, v)| [encode(k, spec.alphabet), encode(v, spec.alphabet)]);
                    items.push(joined(spec, var, flat));
                }
            }
        }
    }

    if !items.is_empty() {
        out.push_str(spec.prefix);
        out.push_str(&items.join(spec.separator.to_string().as_str()));
    }
    Ok(())
}

fn scalar_item(spec: &OperatorSpec, var: &VariableSpec, value: &str) -> String {
    let escaped = encode(value, spec.alphabet);
    let value = cut(&escaped, var.max_length);
    if spec.named {
        pair(spec, &var.name, value.to_string())
    } else {
        value.to_string()
    }
}

/// `name=value`, or just `name` for an empty value without `pair_if_empty`
fn pair(spec: &OperatorSpec, name: &str, value: String) -> String {
    if value.is_empty() && !spec.pair_if_empty {
        name.to_string()
    } else {
        format!("{}{}{}", name, spec.connector, value)
    }
}

/// One item for a non-exploded composite value
fn joined(spec: &OperatorSpec, var: &VariableSpec, values: impl Iterator<Item = String>) -> String {
    let mut item = String::new();
    if spec.named {
        item.push_str(&var.name);
        item.push(spec.connector);
    }
    for (i, value) in values.enumerate() {
        if i > 0 {
            item.push(spec.list_connector);
        }
        item.push_str(&value);
    }
    item
}
