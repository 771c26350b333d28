#![forbid(unsafe_code)]

//! The closed set of primitives a [`ModelDb`](crate::ModelDb) can store.

use std::fmt;

use modeldb_core::{Disposable, ObservableJson, ObservableKind, ObservableString, ObservableValue};
use modeldb_undo::ObservableUndoableList;
use serde_json::Value;

/// Any observable stored under a path.
///
/// Cloning clones the handle; both copies refer to the same observable.
#[derive(Clone)]
pub enum Observable {
    Map(ObservableJson),
    List(ObservableUndoableList<Value>),
    String(ObservableString),
    Value(ObservableValue),
}

impl Observable {
    #[must_use]
    pub fn kind(&self) -> ObservableKind {
        match self {
            Self::Map(_) => ObservableKind::Map,
            Self::List(_) => ObservableKind::List,
            Self::String(_) => ObservableKind::String,
            Self::Value(_) => ObservableKind::Value,
        }
    }

    /// Whether both handles refer to the same observable.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (Self::String(a), Self::String(b)) => a.ptr_eq(b),
            (Self::Value(a), Self::Value(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&ObservableJson> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ObservableUndoableList<Value>> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<&ObservableString> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&ObservableValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::String(text) => f.debug_tuple("String").field(text).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl Disposable for Observable {
    fn dispose(&self) {
        match self {
            Self::Map(map) => map.dispose(),
            Self::List(list) => list.dispose(),
            Self::String(text) => text.dispose(),
            Self::Value(value) => value.dispose(),
        }
    }

    fn is_disposed(&self) -> bool {
        match self {
            Self::Map(map) => map.is_disposed(),
            Self::List(list) => list.is_disposed(),
            Self::String(text) => text.is_disposed(),
            Self::Value(value) => value.is_disposed(),
        }
    }
}

impl From<ObservableJson> for Observable {
    fn from(map: ObservableJson) -> Self {
        Self::Map(map)
    }
}

impl From<ObservableUndoableList<Value>> for Observable {
    fn from(list: ObservableUndoableList<Value>) -> Self {
        Self::List(list)
    }
}

impl From<ObservableString> for Observable {
    fn from(text: ObservableString) -> Self {
        Self::String(text)
    }
}

impl From<ObservableValue> for Observable {
    fn from(value: ObservableValue) -> Self {
        Self::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldb_undo::IdentitySerializer;
    use serde_json::json;

    #[test]
    fn kind_follows_variant() {
        let list = ObservableUndoableList::new(IdentitySerializer);
        assert_eq!(Observable::from(list).kind(), ObservableKind::List);
        assert_eq!(
            Observable::from(ObservableJson::new()).kind(),
            ObservableKind::Map
        );
        assert_eq!(
            Observable::from(ObservableString::default()).kind(),
            ObservableKind::String
        );
        assert_eq!(
            Observable::from(ObservableValue::default()).kind(),
            ObservableKind::Value
        );
    }

    #[test]
    fn ptr_eq_is_identity() {
        let value = ObservableValue::new(json!(1));
        let a = Observable::from(value.clone());
        let b = Observable::from(value);
        let c = Observable::from(ObservableValue::new(json!(1)));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert!(!a.ptr_eq(&Observable::from(ObservableString::default())));
    }

    #[test]
    fn accessors_match_variant() {
        let text = Observable::from(ObservableString::new("x"));
        assert!(text.as_string().is_some());
        assert!(text.as_map().is_none());
        assert!(text.as_list().is_none());
        assert!(text.as_value().is_none());
    }

    #[test]
    fn dispose_reaches_the_primitive() {
        let value = ObservableValue::new(json!("v"));
        let observable = Observable::from(value.clone());
        observable.dispose();
        assert!(value.is_disposed());
        assert!(observable.is_disposed());
    }
}
