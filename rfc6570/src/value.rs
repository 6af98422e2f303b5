//! Variable values
//!
//! Expansion reads values through the [`Variables`] trait; extraction
//! produces them.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// A template variable value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    /// No value; the variable is skipped on expansion
    #[default]
    Undefined,
    /// A string
    Scalar(String),
    /// An ordered list of strings
    List(Vec<String>),
    /// Ordered key/value pairs
    Assoc(Vec<(String, String)>),
}

impl Value {
    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined)
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_assoc(&self) -> Option<&[(String, String)]> {
        match self {
            Value::Assoc(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Fold duplicate assoc keys: the last value wins, the first position
    /// is kept. Other values are returned unchanged.
    pub fn fold_duplicate_keys(self) -> Value {
        match self {
            Value::Assoc(pairs) => {
                let mut folded: Vec<(String, String)> = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    match folded.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => slot.1 = value,
                        None => folded.push((key, value)),
                    }
                }
                Value::Assoc(folded)
            }
            other => other,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Scalar(s.clone())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(b.to_string())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Scalar(c.to_string())
    }
}

macro_rules! scalar_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Scalar(n.to_string())
                }
            }
        )*
    };
}

scalar_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::List(items.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Value {
    fn from(items: &[&str]) -> Self {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(items: [&str; N]) -> Self {
        Value::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<(String, String)>> for Value {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Value::Assoc(pairs)
    }
}

impl From<Vec<(&str, &str)>> for Value {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Value::Assoc(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Value {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Value::Assoc(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        Value::Assoc(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K: Into<String>, V: Into<String>, S> From<HashMap<K, V, S>> for Value {
    fn from(map: HashMap<K, V, S>) -> Self {
        Value::Assoc(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

/// A source of variable values for expansion
pub trait Variables {
    /// The value bound to `name`, `None` when unbound
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl<K, S> Variables for HashMap<K, Value, S>
where
    K: Borrow<str> + Hash + Eq,
    S: BuildHasher,
{
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<K: Borrow<str> + Ord> Variables for BTreeMap<K, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl<K: AsRef<str>> Variables for [(K, Value)] {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.iter()
            .find(|(key, _)| key.as_ref() == name)
            .map(|(_, value)| value)
    }
}

impl<K: AsRef<str>> Variables for Vec<(K, Value)> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.as_slice().lookup(name)
    }
}

impl<K: AsRef<str>, const N: usize> Variables for [(K, Value); N] {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.as_slice().lookup(name)
    }
}

impl<T: Variables + ?Sized> Variables for &T {
    fn lookup(&self, name: &str) -> Option<&Value> {
        (**self).lookup(name)
    }
}

#[cfg(feature = "json")]
mod json {
    use serde::ser::{SerializeMap, SerializeSeq};
    use serde::{Serialize, Serializer};

    use super::Value;
    use crate::error::{Result, TemplateError};

    fn unconvertable(value: &serde_json::Value) -> TemplateError {
        TemplateError::Unconvertable {
            value: value.to_string(),
        }
    }

    fn scalar(value: &serde_json::Value) -> Result<String> {
        match value {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::Bool(b) => Ok(b.to_string()),
            other => Err(unconvertable(other)),
        }
    }

    impl Value {
        /// Convert a JSON document node. `null` is undefined, arrays are
        /// lists and objects are assocs; nested containers can't be
        /// expanded.
        pub fn from_json(value: &serde_json::Value) -> Result<Value> {
            match value {
                serde_json::Value::Null => Ok(Value::Undefined),
                serde_json::Value::Array(items) => {
                    Ok(Value::List(items.iter().map(scalar).collect::<Result<_>>()?))
                }
                serde_json::Value::Object(map) => Ok(Value::Assoc(
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), scalar(v)?)))
                        .collect::<Result<_>>()?,
                )),
                other => scalar(other).map(Value::Scalar),
            }
        }
    }

    impl From<&Value> for serde_json::Value {
        fn from(value: &Value) -> Self {
            match value {
                Value::Undefined => serde_json::Value::Null,
                Value::Scalar(s) => serde_json::Value::String(s.clone()),
                Value::List(items) => {
                    items.iter().cloned().map(serde_json::Value::String).collect()
                }
                Value::Assoc(pairs) => serde_json::Value::Object(
                    pairs
                        .iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                        .collect(),
                ),
            }
        }
    }

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
            match self {
                Value::Undefined => serializer.serialize_none(),
                Value::Scalar(s) => serializer.serialize_str(s),
                Value::List(items) => {
                    let mut seq = serializer.serialize_seq(Some(items.len()))?;
                    for item in items {
                        seq.serialize_element(item)?;
                    }
                    seq.end()
                }
                Value::Assoc(pairs) => {
                    let mut map = serializer.serialize_map(Some(pairs.len()))?;
                    for (k, v) in pairs {
                        map.serialize_entry(k, v)?;
                    }
                    map.end()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from("x"), Value::Scalar("x".to_string()));
        assert_eq!(Value::from(42u32), Value::Scalar("42".to_string()));
        assert_eq!(Value::from(true), Value::Scalar("true".to_string()));
        assert_eq!(
            Value::from(["a", "b"]),
            Value::List(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            Value::from([("k", "v")]),
            Value::Assoc(vec![("k".to_string(), "v".to_string())])
        );
        assert_eq!(Value::from(None::<&str>), Value::Undefined);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn test_lookup() {
        let map: HashMap<&str, Value> = HashMap::from([("var", Value::from("value"))]);
        assert_eq!(map.lookup("var"), Some(&Value::from("value")));
        assert_eq!(map.lookup("other"), None);

        let pairs = vec![("a", Value::from("1")), ("a", Value::from("2"))];
        assert_eq!(pairs.lookup("a"), Some(&Value::from("1")));

        let tree: BTreeMap<String, Value> = BTreeMap::from([("x".to_string(), Value::from(1))]);
        assert_eq!((&tree).lookup("x"), Some(&Value::from("1")));
    }

    #[test]
    fn test_fold_duplicate_keys() {
        let value = Value::from(vec![("a", "1"), ("b", "2"), ("a", "3")]).fold_duplicate_keys();
        assert_eq!(value, Value::from(vec![("a", "3"), ("b", "2")]));
        assert_eq!(Value::from("x").fold_duplicate_keys(), Value::from("x"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_from_json() {
        let doc = serde_json::json!({"n": 1, "l": ["a", 2], "o": {"k": "v"}, "z": null});
        assert_eq!(Value::from_json(&doc["n"]).unwrap(), Value::from("1"));
        assert_eq!(Value::from_json(&doc["l"]).unwrap(), Value::from(["a", "2"]));
        assert_eq!(Value::from_json(&doc["o"]).unwrap(), Value::from([("k", "v")]));
        assert_eq!(Value::from_json(&doc["z"]).unwrap(), Value::Undefined);

        let nested = serde_json::json!([["a"]]);
        assert!(matches!(
            Value::from_json(&nested),
            Err(crate::error::TemplateError::Unconvertable { .. })
        ));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_serialize() {
        let value = Value::from(vec![("a", "1")]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":"1"}"#);
        assert_eq!(serde_json::to_value(Value::Undefined).unwrap(), serde_json::Value::Null);
    }
}
