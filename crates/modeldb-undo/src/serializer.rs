#![forbid(unsafe_code)]

//! Conversion between list items and their JSON form.
//!
//! History entries store JSON copies of list items, never the live items, so
//! later in-place changes to an item cannot rewrite the past.

use std::fmt;
use std::marker::PhantomData;

use modeldb_core::ModelResult;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Two-way conversion used to snapshot list items into undo history.
pub trait Serializer<T> {
    /// JSON copy of `value`.
    fn to_json(&self, value: &T) -> ModelResult<Value>;

    /// Rebuild an item from a JSON copy.
    fn from_json(&self, json: &Value) -> ModelResult<T>;
}

/// Serializer for items that already are JSON values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentitySerializer;

impl Serializer<Value> for IdentitySerializer {
    fn to_json(&self, value: &Value) -> ModelResult<Value> {
        Ok(value.clone())
    }

    fn from_json(&self, json: &Value) -> ModelResult<Value> {
        Ok(json.clone())
    }
}

/// Serializer for any `serde` round-trippable item type.
pub struct SerdeSerializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSerializer<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for SerdeSerializer<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerdeSerializer")
    }
}

impl<T: Serialize + DeserializeOwned> Serializer<T> for SerdeSerializer<T> {
    fn to_json(&self, value: &T) -> ModelResult<Value> {
        Ok(serde_json::to_value(value)?)
    }

    fn from_json(&self, json: &Value) -> ModelResult<T> {
        Ok(T::deserialize(json)?)
    }
}
