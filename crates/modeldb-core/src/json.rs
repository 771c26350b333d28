#![forbid(unsafe_code)]

//! JSON-valued observable map.
//!
//! [`ObservableJson`] is an [`ObservableMap`] over [`serde_json::Value`]
//! whose comparator is structural ([`json_deep_equal`]) rather than
//! identity, so writing a structurally equal object is a no-op.

use std::fmt;
use std::ops::Deref;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::kind::Disposable;
use crate::map::ObservableMap;

/// A JSON object: string keys, JSON values.
pub type JsonObject = serde_json::Map<String, Value>;

/// Structural equality on JSON values.
///
/// Numbers compare by numeric value, so `1` equals `1.0`. Arrays compare
/// element-wise in order; objects compare by key set and per-key value.
#[must_use]
pub fn json_deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            x == y
                || matches!((x.as_f64(), y.as_f64()), (Some(x), Some(y)) if x == y)
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_deep_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_deep_equal(v, w)))
        }
        _ => a == b,
    }
}

/// An observable map of JSON values with deep-equality change suppression.
#[derive(Clone)]
pub struct ObservableJson {
    map: ObservableMap<Value>,
}

impl fmt::Debug for ObservableJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservableJson").field(&self.map).finish()
    }
}

impl Default for ObservableJson {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for ObservableJson {
    type Target = ObservableMap<Value>;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

impl ObservableJson {
    /// Create an empty JSON map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: ObservableMap::with_comparator(json_deep_equal),
        }
    }

    /// Create a JSON map seeded from an object. Seeding emits nothing.
    #[must_use]
    pub fn from_object(values: JsonObject) -> Self {
        let json = Self::new();
        json.map.seed(values);
        json
    }

    /// The underlying map handle.
    #[must_use]
    pub fn as_map(&self) -> &ObservableMap<Value> {
        &self.map
    }

    /// Deep copy of the current entries as a plain JSON object.
    ///
    /// `Value` has no unset state, so every stored key appears in the result.
    #[must_use]
    pub fn to_json(&self) -> JsonObject {
        self.map.entries().into_iter().collect()
    }

    /// Whether `other` is a handle to the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map)
    }
}

impl Serialize for ObservableJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl Disposable for ObservableJson {
    fn dispose(&self) {
        self.map.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.map.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn deep_equal_rules() {
        assert!(json_deep_equal(&json!(1), &json!(1.0)));
        assert!(json_deep_equal(
            &json!({"a": [1, {"b": null}], "c": "x"}),
            &json!({"c": "x", "a": [1, {"b": null}]})
        ));
        assert!(!json_deep_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!json_deep_equal(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
        assert!(!json_deep_equal(&json!("1"), &json!(1)));
        assert!(!json_deep_equal(&json!(null), &json!(false)));
    }

    #[test]
    fn structurally_equal_write_is_silent() {
        let meta = ObservableJson::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let _sub = meta
            .changed()
            .connect(move |_, _| count_clone.set(count_clone.get() + 1));

        meta.set("tags", json!({"collapsed": true, "ids": [1, 2]}));
        meta.set("tags", json!({"ids": [1, 2], "collapsed": true}));
        meta.set("tags", json!({"ids": [1, 2], "collapsed": false}));

        assert_eq!(count.get(), 2);
    }

    #[test]
    fn to_json_is_a_detached_copy() {
        let meta = ObservableJson::new();
        meta.set("name", json!("cell"));
        meta.set("nested", json!({"depth": 1}));

        let mut snapshot = meta.to_json();
        snapshot.insert("name".into(), json!("changed"));

        assert_eq!(meta.get("name"), Some(json!("cell")));
        assert_eq!(
            Value::Object(meta.to_json()),
            json!({"name": "cell", "nested": {"depth": 1}})
        );
    }

    #[test]
    fn seeded_from_object() {
        let Value::Object(object) = json!({"a": 1, "b": [true]}) else {
            unreachable!()
        };
        let meta = ObservableJson::from_object(object);
        assert_eq!(meta.size(), 2);
        assert_eq!(
            serde_json::to_value(&meta).unwrap(),
            json!({"a": 1, "b": [true]})
        );
    }

    #[test]
    fn dispose_clears() {
        let meta = ObservableJson::new();
        meta.set("k", json!(1));
        meta.dispose();
        meta.dispose();
        assert!(meta.is_disposed());
        assert!(meta.to_json().is_empty());
    }
}
