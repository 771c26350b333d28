#![forbid(unsafe_code)]

//! Single observable JSON value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json::json_deep_equal;
use crate::kind::{Disposable, ObservableKind};
use crate::signal::Signal;

/// Change record emitted by [`ObservableValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    pub old_value: Value,
    pub new_value: Value,
}

struct ValueShared {
    value: RefCell<Value>,
    disposed: Cell<bool>,
    changed: Signal<ObservableValue, ValueChange>,
}

/// An observable holding one JSON value.
///
/// Writes that are deep-equal to the current value are ignored.
#[derive(Clone)]
pub struct ObservableValue {
    shared: Rc<ValueShared>,
}

impl fmt::Debug for ObservableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableValue")
            .field("value", &self.shared.value.borrow())
            .field("disposed", &self.shared.disposed.get())
            .finish()
    }
}

impl Default for ObservableValue {
    fn default() -> Self {
        Self::new(Value::Null)
    }
}

impl ObservableValue {
    #[must_use]
    pub fn new(initial: Value) -> Self {
        Self {
            shared: Rc::new(ValueShared {
                value: RefCell::new(initial),
                disposed: Cell::new(false),
                changed: Signal::new(),
            }),
        }
    }

    #[must_use]
    pub fn changed(&self) -> &Signal<Self, ValueChange> {
        &self.shared.changed
    }

    #[must_use]
    pub const fn kind(&self) -> ObservableKind {
        ObservableKind::Value
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> Value {
        self.shared.value.borrow().clone()
    }

    /// Replace the value, emitting `{oldValue, newValue}` unless the two are
    /// deep-equal.
    pub fn set(&self, value: Value) {
        if self.shared.disposed.get() {
            return;
        }
        let old_value = {
            let mut current = self.shared.value.borrow_mut();
            if json_deep_equal(&current, &value) {
                return;
            }
            std::mem::replace(&mut *current, value.clone())
        };
        tracing::trace!("value set");
        self.shared.changed.emit(
            self,
            &ValueChange {
                old_value,
                new_value: value,
            },
        );
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Disposable for ObservableValue {
    fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.shared.changed.close();
        *self.shared.value.borrow_mut() = Value::Null;
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emits_old_and_new() {
        let value = ObservableValue::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let _sub = value
            .changed()
            .connect(move |_, change: &ValueChange| log_clone.borrow_mut().push(change.clone()));

        value.set(json!(true));
        value.set(json!(true));
        value.set(json!({"x": 1}));
        value.set(json!({"x": 1.0}));

        assert_eq!(
            *log.borrow(),
            vec![
                ValueChange {
                    old_value: Value::Null,
                    new_value: json!(true),
                },
                ValueChange {
                    old_value: json!(true),
                    new_value: json!({"x": 1}),
                },
            ]
        );
        assert_eq!(value.get(), json!({"x": 1}));
    }

    #[test]
    fn dispose_resets_and_silences() {
        let value = ObservableValue::new(json!("trusted"));
        let fired = Rc::new(Cell::new(false));
        let fired_clone = Rc::clone(&fired);
        let _sub = value.changed().connect(move |_, _| fired_clone.set(true));

        value.dispose();
        value.dispose();
        value.set(json!("ignored"));

        assert!(value.is_disposed());
        assert_eq!(value.get(), Value::Null);
        assert!(!fired.get());
    }

    #[test]
    fn wire_shape() {
        let change = ValueChange {
            old_value: json!(1),
            new_value: json!(2),
        };
        assert_eq!(
            serde_json::to_value(change).unwrap(),
            json!({"oldValue": 1, "newValue": 2})
        );
    }
}
