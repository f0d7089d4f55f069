//! # Secret Values
//!
//! Loosely typed payload and tag values as they come back from the backends.
//!
//! Backends disagree on representation: Vault hands back JSON numbers that may be
//! integers or floats depending on how they were written, AWS stores a JSON string
//! that is parsed again on every read. [`Value`] equality is structural and treats
//! an integer and a float with the same numeric value as equal, so a payload that
//! went through a serialization round trip still compares equal to the original.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Secret payload or tag map, keyed by field name
pub type SecretMap = BTreeMap<String, Value>;

/// A scalar or structured value stored in a secret
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
}

impl Value {
    /// Borrow the string content, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Exact comparison of an integer with a float: the float must be whole and
/// within `i64` range.
#[allow(
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    reason = "The float is checked to be whole and in range before the cast"
)]
fn integer_eq_float(integer: i64, float: f64) -> bool {
    // 2^63, the first whole float past i64::MAX
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    float.fract() == 0.0 && (-UPPER..UPPER).contains(&float) && float as i64 == integer
}

impl PartialEq for Value {
    #[allow(
        clippy::float_cmp,
        reason = "JSON numbers round trip through f64, exact equality is intended"
    )]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                integer_eq_float(*i, *f)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Mapping(a), Value::Mapping(b)) => a == b,
            _ => false,
        }
    }
}

/// Strings render bare, everything else renders as JSON
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => f.write_str(s),
            Value::Sequence(_) | Value::Mapping(_) => {
                let json = serde_json::Value::from(self.clone());
                write!(f, "{json}")
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                // u64 beyond i64::MAX and real floats both land here
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Integer(i) => serde_json::Value::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Convert a JSON object into a [`SecretMap`]; anything else is rejected
#[must_use]
pub fn map_from_json(value: serde_json::Value) -> Option<SecretMap> {
    match value {
        serde_json::Value::Object(map) => Some(
            map.into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect(),
        ),
        _ => None,
    }
}

/// Render a [`SecretMap`] as a JSON object
#[must_use]
pub fn map_to_json(map: &SecretMap) -> serde_json::Value {
    serde_json::Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), value.clone().into()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_equals_float_with_same_value() {
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(42.0), Value::Integer(42));
        assert_ne!(Value::Integer(1), Value::Float(1.5));
    }

    #[test]
    fn test_large_integers_compare_exactly() {
        // 2^53 + 1 has no f64 representation and used to round onto 2^53
        assert_ne!(
            Value::Integer(9_007_199_254_740_993),
            Value::Float(9_007_199_254_740_992.0)
        );
        assert_eq!(
            Value::Integer(9_007_199_254_740_992),
            Value::Float(9_007_199_254_740_992.0)
        );
        // i64::MAX rounds up to 2^63 as a float, which is out of range
        assert_ne!(Value::Integer(i64::MAX), Value::Float(9_223_372_036_854_775_808.0));
        assert_eq!(Value::Integer(i64::MIN), Value::Float(-9_223_372_036_854_775_808.0));
        assert_ne!(Value::Integer(0), Value::Float(f64::NAN));
        assert_ne!(Value::Integer(0), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_different_kinds_are_not_equal() {
        assert_ne!(Value::from("1"), Value::Integer(1));
        assert_ne!(Value::Bool(true), Value::Integer(1));
        assert_ne!(Value::Null, Value::from(""));
    }

    #[test]
    fn test_nested_round_trip_compares_equal() {
        let mut inner = BTreeMap::new();
        inner.insert("port".to_string(), Value::Integer(5432));
        inner.insert("ratio".to_string(), Value::Float(0.5));
        let original = Value::Mapping(BTreeMap::from([
            ("db".to_string(), Value::Mapping(inner)),
            (
                "hosts".to_string(),
                Value::Sequence(vec![Value::from("a"), Value::from("b")]),
            ),
        ]));

        // Serialise through JSON text and back, as a backend would
        let text = serde_json::to_string(&original).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);

        // A float-typed copy of the same payload still compares equal
        let drifted = Value::from(json!({
            "db": { "port": 5432.0, "ratio": 0.5 },
            "hosts": ["a", "b"],
        }));
        assert_eq!(drifted, original);
    }

    #[test]
    fn test_deserialize_untagged() {
        let parsed: SecretMap =
            serde_json::from_str(r#"{"a": null, "b": true, "c": 3, "d": 2.5, "e": "x"}"#).unwrap();
        assert!(parsed["a"].is_null());
        assert_eq!(parsed["b"], Value::Bool(true));
        assert!(matches!(parsed["c"], Value::Integer(3)));
        assert_eq!(parsed["d"], Value::Float(2.5));
        assert_eq!(parsed["e"].as_str(), Some("x"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("staging").to_string(), "staging");
        assert_eq!(Value::Integer(7).to_string(), "7");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(
            Value::Sequence(vec![Value::Integer(1), Value::from("a")]).to_string(),
            r#"[1,"a"]"#
        );
    }

    #[test]
    fn test_map_from_json_rejects_non_objects() {
        assert!(map_from_json(json!("plain")).is_none());
        assert!(map_from_json(json!([1, 2])).is_none());
        let map = map_from_json(json!({"user": "admin"})).unwrap();
        assert_eq!(map["user"], Value::from("admin"));
        assert_eq!(map_to_json(&map), json!({"user": "admin"}));
    }
}
