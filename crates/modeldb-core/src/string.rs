#![forbid(unsafe_code)]

//! Observable text buffer.
//!
//! Positions are counted in Unicode scalar values (`char`s), not bytes, and
//! are clamped to the current text length. Every insert and remove may carry
//! an opaque `options` payload that is echoed back untouched in the change
//! record, which lets an editor tag its own edits.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::{Disposable, ObservableKind};
use crate::signal::Signal;

/// Kind of a text mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringChangeKind {
    Insert,
    Remove,
    Set,
}

/// Change record emitted by [`ObservableString`].
///
/// `[start, end)` is the affected span: for `insert` and `set` it covers the
/// new text, for `remove` the text that was deleted. `value` is that text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringChange {
    #[serde(rename = "type")]
    pub kind: StringChangeKind,
    pub start: usize,
    pub end: usize,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(offset, _)| offset)
}

struct StringShared {
    text: RefCell<String>,
    disposed: Cell<bool>,
    changed: Signal<ObservableString, StringChange>,
}

/// A mutation-notifying text value.
#[derive(Clone)]
pub struct ObservableString {
    shared: Rc<StringShared>,
}

impl fmt::Debug for ObservableString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableString")
            .field("text", &self.shared.text.borrow())
            .field("disposed", &self.shared.disposed.get())
            .finish()
    }
}

impl Default for ObservableString {
    fn default() -> Self {
        Self::new("")
    }
}

impl ObservableString {
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(StringShared {
                text: RefCell::new(initial.into()),
                disposed: Cell::new(false),
                changed: Signal::new(),
            }),
        }
    }

    #[must_use]
    pub fn changed(&self) -> &Signal<Self, StringChange> {
        &self.shared.changed
    }

    #[must_use]
    pub const fn kind(&self) -> ObservableKind {
        ObservableKind::String
    }

    /// Clone of the current text.
    #[must_use]
    pub fn text(&self) -> String {
        self.shared.text.borrow().clone()
    }

    /// Length in `char`s.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.text.borrow().chars().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.text.borrow().is_empty()
    }

    /// Replace the whole text. Identical text is a no-op.
    pub fn set_text(&self, text: impl Into<String>) {
        if self.shared.disposed.get() {
            return;
        }
        let text = text.into();
        {
            let mut current = self.shared.text.borrow_mut();
            if *current == text {
                return;
            }
            current.clone_from(&text);
        }
        self.emit(StringChange {
            kind: StringChangeKind::Set,
            start: 0,
            end: text.chars().count(),
            value: text,
            options: None,
        });
    }

    /// Splice `text` in at char position `index`.
    pub fn insert(&self, index: usize, text: &str) {
        self.insert_inner(index, text, None);
    }

    /// Like [`insert`](Self::insert), echoing `options` in the change record.
    pub fn insert_with_options(&self, index: usize, text: &str, options: Value) {
        self.insert_inner(index, text, Some(options));
    }

    /// Delete the char span `[start, end)`.
    pub fn remove(&self, start: usize, end: usize) {
        self.remove_inner(start, end, None);
    }

    /// Like [`remove`](Self::remove), echoing `options` in the change record.
    pub fn remove_with_options(&self, start: usize, end: usize, options: Value) {
        self.remove_inner(start, end, Some(options));
    }

    /// Equivalent to `set_text("")`.
    pub fn clear(&self) {
        self.set_text(String::new());
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    fn insert_inner(&self, index: usize, text: &str, options: Option<Value>) {
        if text.is_empty() || self.shared.disposed.get() {
            return;
        }
        let start = {
            let mut current = self.shared.text.borrow_mut();
            let start = index.min(current.chars().count());
            let offset = byte_offset(&current, start);
            current.insert_str(offset, text);
            start
        };
        self.emit(StringChange {
            kind: StringChangeKind::Insert,
            start,
            end: start + text.chars().count(),
            value: text.to_string(),
            options,
        });
    }

    fn remove_inner(&self, start: usize, end: usize, options: Option<Value>) {
        let (start, end, removed) = {
            let mut current = self.shared.text.borrow_mut();
            let length = current.chars().count();
            let end = end.min(length);
            if start >= end {
                return;
            }
            let range = byte_offset(&current, start)..byte_offset(&current, end);
            let removed: String = current.drain(range).collect();
            (start, end, removed)
        };
        self.emit(StringChange {
            kind: StringChangeKind::Remove,
            start,
            end,
            value: removed,
            options,
        });
    }

    fn emit(&self, change: StringChange) {
        tracing::trace!(kind = ?change.kind, start = change.start, end = change.end, "string change");
        self.shared.changed.emit(self, &change);
    }
}

impl Disposable for ObservableString {
    fn dispose(&self) {
        if self.shared.disposed.replace(true) {
            return;
        }
        self.shared.changed.close();
        self.shared.text.borrow_mut().clear();
    }

    fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}
