#![forbid(unsafe_code)]

//! Ordered sequence that announces every structural mutation.
//!
//! # Design
//!
//! [`ObservableList<T>`] is a shared handle (like [`ObservableMap`]) over a
//! `Vec<T>`. Each mutation emits exactly one [`ListChange`] describing the
//! kind of edit, where it happened and the contiguous slice of old and new
//! values involved. The record is precise enough to replay or invert the
//! edit, which is what the undo layer relies on.
//!
//! # Change records
//!
//! | Operation            | kind   | oldIndex | newIndex | oldValues | newValues |
//! |----------------------|--------|----------|----------|-----------|-----------|
//! | `push`, `push_all`   | add    | -1       | first new slot | `[]` | pushed |
//! | `insert`, `insert_all` | add  | -2       | insert index | `[]` | inserted |
//! | `remove`, `remove_range` | remove | start | -1     | removed   | `[]`      |
//! | `move_item`          | move   | from     | to       | `[v]`     | `[v]`     |
//! | `set`                | set    | index    | index    | `[old]`   | `[new]`   |
//! | `clear`              | clear  | 0        | 0        | everything | `[]`     |
//!
//! # Invariants
//!
//! 1. `set` with a value equal (under the item comparator) to the stored one
//!    is a no-op.
//! 2. Degenerate edits (empty batches, empty ranges, moves onto the same
//!    slot, clearing an empty list) are silent no-ops.
//! 3. Once disposed, the list is empty, ignores writes, and is silent.
//!
//! [`ObservableMap`]: crate::map::ObservableMap

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::kind::{Disposable, ObservableKind};
use crate::map::Comparator;
use crate::signal::Signal;

/// `oldIndex` of an `add` produced by `push`/`push_all`.
pub const PUSH_INDEX: isize = -1;

/// `oldIndex` of an `add` produced by `insert`/`insert_all`.
pub const INSERT_INDEX: isize = -2;

/// `newIndex` of a `remove`.
pub const NO_INDEX: isize = -1;

/// Kind of a list mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListChangeKind {
    Add,
    Remove,
    Move,
    Set,
    Clear,
}

/// Change record emitted by [`ObservableList`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListChange<T> {
    #[serde(rename = "type")]
    pub kind: ListChangeKind,
    pub old_index: isize,
    pub new_index: isize,
    pub old_values: Vec<T>,
    pub new_values: Vec<T>,
}

impl<T> ListChange<T> {
    /// Whether this is an `add` produced by `push`/`push_all`.
    #[must_use]
    pub fn is_push(&self) -> bool {
        self.kind == ListChangeKind::Add && self.old_index == PUSH_INDEX
    }

    /// Convert the carried values, keeping kind and indices.
    pub fn try_map_values<U, E>(
        &self,
        mut f: impl FnMut(&T) -> Result<U, E>,
    ) -> Result<ListChange<U>, E> {
        Ok(ListChange {
            kind: self.kind,
            old_index: self.old_index,
            new_index: self.new_index,
            old_values: self.old_values.iter().map(&mut f).collect::<Result<_, _>>()?,
            new_values: self.new_values.iter().map(&mut f).collect::<Result<_, _>>()?,
        })
    }
}

#[inline]
fn wire(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}

struct ListShared<T> {
    items: RefCell<Vec<T>>,
    comparator: Comparator<T>,
    disposed: Cell<bool>,
    changed: Signal<ObservableList<T>, ListChange<T>>,
}

/// A mutation-notifying ordered sequence.
pub struct ObservableList<T> {
    shared: Rc<ListShared<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.shared.items.borrow())
            .field("disposed", &self.shared.disposed.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    /// Create an empty list comparing items with `PartialEq`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(|a: &T, b: &T| a == b)
    }

    /// Create a list seeded with `values`. Seeding emits nothing.
    #[must_use]
    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::new().with_values(values)
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    /// Create an empty list using a custom item comparator.
    #[must_use]
    pub fn with_comparator(comparator: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            shared: Rc::new(ListShared {
                items: RefCell::new(Vec::new()),
                comparator: Rc::new(comparator),
                disposed: Cell::new(false),
                changed: Signal::new(),
            }),
        }
    }

    /// Append `values` without emitting anything.
    #[must_use]
    pub fn with_values(self, values: impl IntoIterator<Item = T>) -> Self {
        self.shared.items.borrow_mut().extend(values);
        self
    }

    /// Signal carrying one [`ListChange`] per mutation.
    #[must_use]
    pub fn changed(&self) -> &Signal<Self, ListChange<T>> {
        &self.shared.changed
    }

    /// Always [`ObservableKind::List`].
    #[must_use]
    pub const fn kind(&self) -> ObservableKind {
        ObservableKind::List
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.shared.items.borrow().get(index).cloned()
    }

    /// Snapshot of the items in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.shared.items.borrow().clone()
    }

    /// Iterate over a snapshot taken now. Later mutations do not affect it.
    #[must_use]
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    /// Index of the first item matching `value` under the item comparator.
    #[must_use]
    pub fn position(&self, value: &T) -> Option<usize> {
        let cmp = &self.shared.comparator;
        self.shared.items.borrow().iter().position(|item| cmp(item, value))
    }

    /// Replace the item at `index`.
    ///
    /// # Errors
    ///
    /// [`ModelError::InvalidValue`] if `index` is not an existing slot.
    pub fn set(&self, index: usize, value: T) -> ModelResult<()> {
        if self.shared.disposed.get() {
            return Ok(());
        }
        let old = {
            let mut items = self.shared.items.borrow_mut();
            let length = items.len();
            let slot = items
                .get_mut(index)
                .ok_or_else(|| ModelError::slot_out_of_range(index, length))?;
            if (self.shared.comparator)(slot, &value) {
                return Ok(());
            }
            std::mem::replace(slot, value.clone())
        };
        self.emit(ListChange {
            kind: ListChangeKind::Set,
            old_index: wire(index),
            new_index: wire(index),
            old_values: vec![old],
            new_values: vec![value],
        });
        Ok(())
    }

    /// Append `value` and return the new length.
    pub fn push(&self, value: T) -> usize {
        self.push_all([value])
    }

    /// Append every value as one batch and return the new length.
    pub fn push_all(&self, values: impl IntoIterator<Item = T>) -> usize {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() || self.shared.disposed.get() {
            return self.len();
        }
        let (start, length) = {
            let mut items = self.shared.items.borrow_mut();
            let start = items.len();
            items.extend(values.iter().cloned());
            (start, items.len())
        };
        self.emit(ListChange {
            kind: ListChangeKind::Add,
            old_index: PUSH_INDEX,
            new_index: wire(start),
            old_values: Vec::new(),
            new_values: values,
        });
        length
    }

    /// Insert `value` at `index` (clamped to `[0, len]`) and return the new
    /// length.
    pub fn insert(&self, index: usize, value: T) -> usize {
        self.insert_all(index, [value])
    }

    /// Insert every value starting at `index` (clamped to `[0, len]`) as one
    /// batch and return the new length.
    pub fn insert_all(&self, index: usize, values: impl IntoIterator<Item = T>) -> usize {
        let values: Vec<T> = values.into_iter().collect();
        if values.is_empty() || self.shared.disposed.get() {
            return self.len();
        }
        let (index, length) = {
            let mut items = self.shared.items.borrow_mut();
            let index = index.min(items.len());
            items.splice(index..index, values.iter().cloned());
            (index, items.len())
        };
        self.emit(ListChange {
            kind: ListChangeKind::Add,
            old_index: INSERT_INDEX,
            new_index: wire(index),
            old_values: Vec::new(),
            new_values: values,
        });
        length
    }

    /// Remove and return the item at `index`. Out-of-range is a no-op.
    pub fn remove(&self, index: usize) -> Option<T> {
        let value = {
            let mut items = self.shared.items.borrow_mut();
            if index >= items.len() {
                return None;
            }
            items.remove(index)
        };
        self.emit(ListChange {
            kind: ListChangeKind::Remove,
            old_index: wire(index),
            new_index: NO_INDEX,
            old_values: vec![value.clone()],
            new_values: Vec::new(),
        });
        Some(value)
    }

    /// Remove the half-open range `[start, end)` (clamped to the list) and
    /// return the new length.
    pub fn remove_range(&self, start: usize, end: usize) -> usize {
        let (removed, length) = {
            let mut items = self.shared.items.borrow_mut();
            let end = end.min(items.len());
            let start = start.min(end);
            if start == end {
                return items.len();
            }
            let removed: Vec<T> = items.drain(start..end).collect();
            (removed, items.len())
        };
        self.emit(ListChange {
            kind: ListChangeKind::Remove,
            old_index: wire(start),
            new_index: NO_INDEX,
            old_values: removed,
            new_values: Vec::new(),
        });
        length
    }

    /// Remove the first item matching `value` and return where it was.
    pub fn remove_value(&self, value: &T) -> Option<usize> {
        let index = self.position(value)?;
        self.remove(index);
        Some(index)
    }

    /// Move the item at `from` so it ends up at `to`.
    ///
    /// Both indices are clamped to the last slot. Lists with fewer than two
    /// items, and moves onto the same slot, are no-ops.
    pub fn move_item(&self, from: usize, to: usize) {
        let (from, to, value) = {
            let mut items = self.shared.items.borrow_mut();
            let length = items.len();
            if length <= 1 {
                return;
            }
            let from = from.min(length - 1);
            let to = to.min(length - 1);
            if from == to {
                return;
            }
            let value = items.remove(from);
            items.insert(to, value.clone());
            (from, to, value)
        };
        self.emit(ListChange {
            kind: ListChangeKind::Move,
            old_index: wire(from),
            new_index: wire(to),
            old_values: vec![value.clone()],
            new_values: vec![value],
        });
    }

    /// Remove everything as a single `clear` record.
    pub fn clear(&self) {
        let removed = {
            let mut items = self.shared.items.borrow_mut();
            if items.is_empty() {
                return;
            }
            std::mem::take(&mut *items)
        };
        self.emit(ListChange {
            kind: ListChangeKind::Clear,
            old_index: 0,
            new_index: 0,
            old_values: removed,
            new_values: Vec::new(),
        });
    }

    /// Whether `other` is a handle to the same list.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    fn emit(&self, change: ListChange<T>) {
        tracing::trace!(
            kind = ?change.kind,
            old_index = change.old_index,
            new_index = change.new_index,
            "list change"
        );
        self.shared.changed.emit(self, &change);
    }
}

impl<T: Clone + 'static> IntoIterator for &ObservableList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + 'static> Disposable for ObservableList<T> {
    fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.shared.changed.close();
        self.shared.items.borrow_mut().clear();
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}
