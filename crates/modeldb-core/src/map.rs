#![forbid(unsafe_code)]

//! String-keyed dictionary that announces every mutation.
//!
//! # Design
//!
//! [`ObservableMap<T>`] is a cheap handle over shared storage
//! (`Rc<..>` with interior mutability). Cloning a handle does not copy the
//! entries: both handles see the same keys and the same subscribers.
//!
//! # Invariants
//!
//! 1. `set` with a value that compares equal to the stored one (under the
//!    map's comparator) is a no-op and emits nothing.
//! 2. Every effective `set` or `delete` emits exactly one [`MapChange`].
//! 3. `clear` deletes keys one at a time; each deletion emits its own
//!    `remove` record.
//! 4. Once disposed, the map is empty, ignores writes, and is silent.
//!
//! Key order is insertion order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::kind::{Disposable, ObservableKind};
use crate::signal::Signal;

/// Equality used to decide whether a write is redundant.
pub type Comparator<T> = Rc<dyn Fn(&T, &T) -> bool>;

/// Kind of a map mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapChangeKind {
    Add,
    Change,
    Remove,
}

/// Change record emitted by [`ObservableMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapChange<T> {
    #[serde(rename = "type")]
    pub kind: MapChangeKind,
    pub key: String,
    pub old_value: Option<T>,
    pub new_value: Option<T>,
}

struct MapShared<T> {
    entries: RefCell<IndexMap<String, T>>,
    comparator: Comparator<T>,
    disposed: Cell<bool>,
    changed: Signal<ObservableMap<T>, MapChange<T>>,
}

/// A mutation-notifying string-keyed dictionary.
pub struct ObservableMap<T> {
    shared: Rc<MapShared<T>>,
}

impl<T> Clone for ObservableMap<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("entries", &self.shared.entries.borrow())
            .field("disposed", &self.shared.disposed.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableMap<T> {
    /// Create an empty map comparing values with `PartialEq`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(|a: &T, b: &T| a == b)
    }

    /// Create a map pre-seeded with `entries`. Seeding emits nothing.
    #[must_use]
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        let map = Self::new();
        map.seed(entries);
        map
    }
}

impl<T: Clone + 'static> ObservableMap<T> {
    /// Create an empty map using a custom comparator.
    #[must_use]
    pub fn with_comparator(comparator: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            shared: Rc::new(MapShared {
                entries: RefCell::new(IndexMap::new()),
                comparator: Rc::new(comparator),
                disposed: Cell::new(false),
                changed: Signal::new(),
            }),
        }
    }

    /// Insert `entries` without emitting anything.
    pub(crate) fn seed<K: Into<String>>(&self, entries: impl IntoIterator<Item = (K, T)>) {
        let mut store = self.shared.entries.borrow_mut();
        store.extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
    }

    /// Signal carrying one [`MapChange`] per mutation.
    #[must_use]
    pub fn changed(&self) -> &Signal<Self, MapChange<T>> {
        &self.shared.changed
    }

    /// Always [`ObservableKind::Map`].
    #[must_use]
    pub const fn kind(&self) -> ObservableKind {
        ObservableKind::Map
    }

    /// Number of entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.shared.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Clone of the value stored at `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        self.shared.entries.borrow().get(key).cloned()
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.shared.entries.borrow().contains_key(key)
    }

    /// Snapshot of the keys, in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.shared.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of the values, in key insertion order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.shared.entries.borrow().values().cloned().collect()
    }

    /// Snapshot of the key/value pairs, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, T)> {
        self.shared
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Store `value` at `key` and return the previous value.
    ///
    /// If the stored value compares equal to `value`, nothing changes and
    /// no signal is emitted.
    pub fn set(&self, key: impl Into<String>, value: T) -> Option<T> {
        if self.shared.disposed.get() {
            return None;
        }
        let key = key.into();
        let old = {
            let mut entries = self.shared.entries.borrow_mut();
            let old = entries.get(&key).cloned();
            if old
                .as_ref()
                .is_some_and(|existing| (self.shared.comparator)(existing, &value))
            {
                return old;
            }
            entries.insert(key.clone(), value.clone());
            old
        };
        let kind = if old.is_some() {
            MapChangeKind::Change
        } else {
            MapChangeKind::Add
        };
        tracing::trace!(key = %key, ?kind, "map set");
        self.shared.changed.emit(
            self,
            &MapChange {
                kind,
                key,
                old_value: old.clone(),
                new_value: Some(value),
            },
        );
        old
    }

    /// Remove `key` and return its value. Absent keys are a silent no-op.
    pub fn delete(&self, key: &str) -> Option<T> {
        let old = self.shared.entries.borrow_mut().shift_remove(key)?;
        tracing::trace!(key, "map delete");
        self.shared.changed.emit(
            self,
            &MapChange {
                kind: MapChangeKind::Remove,
                key: key.to_string(),
                old_value: Some(old.clone()),
                new_value: None,
            },
        );
        Some(old)
    }

    /// Delete every key, one `remove` record per key.
    pub fn clear(&self) {
        for key in self.keys() {
            self.delete(&key);
        }
    }

    /// Whether `other` is a handle to the same map.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// Whether two values compare equal under this map's comparator.
    #[must_use]
    pub fn values_equal(&self, a: &T, b: &T) -> bool {
        (self.shared.comparator)(a, b)
    }
}

impl<T: Clone + 'static> Disposable for ObservableMap<T> {
    fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.shared.changed.close();
        self.shared.entries.borrow_mut().clear();
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log<T> = Rc<RefCell<Vec<MapChange<T>>>>;

    fn record<T: Clone + 'static>(map: &ObservableMap<T>) -> (Log<T>, crate::Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        let sub = map
            .changed()
            .connect(move |_, change: &MapChange<T>| log_clone.borrow_mut().push(change.clone()));
        (log, sub)
    }

    #[test]
    fn add_then_redundant_set_then_delete() {
        let map = ObservableMap::new();
        let (log, _sub) = record(&map);

        assert_eq!(map.set("x", 1), None);
        assert_eq!(map.set("x", 1), Some(1));
        assert_eq!(map.delete("x"), Some(1));

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[0],
            MapChange {
                kind: MapChangeKind::Add,
                key: "x".into(),
                old_value: None,
                new_value: Some(1),
            }
        );
        assert_eq!(
            log[1],
            MapChange {
                kind: MapChangeKind::Remove,
                key: "x".into(),
                old_value: Some(1),
                new_value: None,
            }
        );
    }

    #[test]
    fn overwrite_reports_change() {
        let map = ObservableMap::new();
        let (log, _sub) = record(&map);

        map.set("k", 0);
        map.set("k", 5);

        let log = log.borrow();
        assert_eq!(log[0].kind, MapChangeKind::Add);
        // A falsy-looking previous value is still a change.
        assert_eq!(log[1].kind, MapChangeKind::Change);
        assert_eq!(log[1].old_value, Some(0));
        assert_eq!(map.get("k"), Some(5));
    }

    #[test]
    fn delete_absent_is_silent() {
        let map: ObservableMap<i32> = ObservableMap::new();
        let (log, _sub) = record(&map);
        assert_eq!(map.delete("missing"), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn clear_emits_one_remove_per_key() {
        let map = ObservableMap::from_entries([("a", 1), ("b", 2), ("c", 3)]);
        let (log, _sub) = record(&map);

        map.clear();

        let log = log.borrow();
        assert_eq!(log.len(), 3);
        assert!(log.iter().all(|c| c.kind == MapChangeKind::Remove));
        assert_eq!(
            log.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(map.is_empty());
    }

    #[test]
    fn snapshots_follow_insertion_order() {
        let map = ObservableMap::new();
        map.set("z", 26);
        map.set("a", 1);
        map.set("m", 13);
        assert_eq!(map.keys(), vec!["z", "a", "m"]);
        assert_eq!(map.values(), vec![26, 1, 13]);
        assert!(map.has("a"));
        assert!(!map.has("b"));
        assert_eq!(map.size(), 3);
    }

    #[test]
    fn custom_comparator_suppresses_writes() {
        let map = ObservableMap::with_comparator(|a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        });
        let (log, _sub) = record(&map);

        map.set("name", "Ada".to_string());
        map.set("name", "ADA".to_string());

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(map.get("name").as_deref(), Some("Ada"));
    }

    #[test]
    fn clones_share_entries_and_subscribers() {
        let map = ObservableMap::new();
        let other = map.clone();
        let (log, _sub) = record(&map);

        other.set("shared", true);
        assert_eq!(map.get("shared"), Some(true));
        assert_eq!(log.borrow().len(), 1);
        assert!(map.ptr_eq(&other));
    }

    #[test]
    fn dispose_is_idempotent_and_silent() {
        let map = ObservableMap::from_entries([("a", 1)]);
        let (log, _sub) = record(&map);

        map.dispose();
        map.dispose();
        assert!(map.is_disposed());
        assert!(map.is_empty());

        assert_eq!(map.set("b", 2), None);
        assert!(!map.has("b"));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn listener_can_write_back() {
        let map = ObservableMap::new();
        let _sub = map.changed().connect(|sender: &ObservableMap<i32>, change| {
            if change.key == "source" {
                if let Some(v) = change.new_value {
                    sender.set("mirror", v);
                }
            }
        });

        map.set("source", 3);
        assert_eq!(map.get("mirror"), Some(3));
    }

    #[test]
    fn change_record_wire_shape() {
        let change = MapChange {
            kind: MapChangeKind::Add,
            key: "x".to_string(),
            old_value: None,
            new_value: Some(1),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "add", "key": "x", "oldValue": null, "newValue": 1})
        );
    }
}
