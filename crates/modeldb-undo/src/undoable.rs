#![forbid(unsafe_code)]

//! Observable list with linear, serializable undo/redo.
//!
//! [`ObservableUndoableList<T>`] wraps an [`ObservableList<T>`] and subscribes
//! to its change signal. Every change made while recording is on is copied
//! through the [`Serializer`] into an [`UndoStack`]. Undo and redo replay the
//! recorded groups back onto the list with recording suspended.
//!
//! # Replay order
//!
//! `undo` walks a group **backwards** applying the inverse of each record;
//! `redo` walks it **forwards** applying each record as-is. Each record's
//! indices are only valid against the list state right before (redo) or
//! right after (undo) that record, so the direction matters for groups with
//! more than one record.
//!
//! | Record  | undo                                   | redo                                 |
//! |---------|----------------------------------------|--------------------------------------|
//! | add     | remove `newValues.len()` at `newIndex` | insert `newValues` at `newIndex` (push if `oldIndex == -1`) |
//! | remove  | insert `oldValues` at `oldIndex`       | remove `oldValues.len()` at `oldIndex` |
//! | set     | set `oldValues` from `oldIndex`        | set `newValues` from `newIndex`      |
//! | move    | move `newIndex` -> `oldIndex`          | move `oldIndex` -> `newIndex`        |
//! | clear   | insert `oldValues` at 0                | clear                                |
//!
//! # Failure Modes
//!
//! - **Unserializable item**: recording logs a warning and clears the
//!   history, which could no longer be replayed faithfully.
//! - **Corrupt entry**: `undo`/`redo` return the error and leave `index`
//!   where it was. Recording is re-enabled regardless.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use modeldb_core::{
    Disposable, ListChange, ListChangeKind, ModelError, ModelResult, ObservableList, Subscription,
};
use serde_json::Value;

use crate::history::{ChangeRecord, HistoryConfig, HistorySnapshot, UndoStack};
use crate::serializer::Serializer;

/// Turns recording off for as long as it lives and restores the previous
/// setting when dropped, including on early return.
struct ReplayGuard<'a> {
    history: &'a RefCell<UndoStack>,
    previous: bool,
}

impl<'a> ReplayGuard<'a> {
    fn suspend(history: &'a RefCell<UndoStack>) -> Self {
        let previous = history.borrow_mut().set_recording(false);
        Self { history, previous }
    }
}

impl Drop for ReplayGuard<'_> {
    fn drop(&mut self) {
        self.history.borrow_mut().set_recording(self.previous);
    }
}

/// Scoped compound operation. Ends the operation when dropped.
///
/// ```ignore
/// {
///     let _op = cells.compound(true);
///     cells.push(json!("a"));
///     cells.push(json!("b"));
/// } // both pushes undo together
/// ```
#[must_use = "the compound operation ends as soon as the guard is dropped"]
pub struct CompoundOperation {
    history: Rc<RefCell<UndoStack>>,
}

impl fmt::Debug for CompoundOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundOperation").finish_non_exhaustive()
    }
}

impl Drop for CompoundOperation {
    fn drop(&mut self) {
        self.history.borrow_mut().end_compound();
        tracing::debug!("compound operation ended");
    }
}

fn position(index: isize) -> ModelResult<usize> {
    usize::try_from(index)
        .map_err(|_| ModelError::InvalidValue(format!("history entry has no position ({index})")))
}

fn record_change<T>(
    history: &RefCell<UndoStack>,
    serializer: &dyn Serializer<T>,
    list: &ObservableList<T>,
    change: &ListChange<T>,
) where
    T: Clone + 'static,
{
    if list.is_disposed() || !history.borrow().is_recording() {
        return;
    }
    match change.try_map_values(|value| serializer.to_json(value)) {
        Ok(record) => history.borrow_mut().record(record),
        Err(err) => {
            tracing::warn!(%err, "list item could not be serialized; discarding undo history");
            history.borrow_mut().clear();
        }
    }
}

/// An [`ObservableList`] that records its changes for undo and redo.
///
/// All list operations are reachable through `Deref`; mutations made through
/// any handle to the wrapped list are recorded.
pub struct ObservableUndoableList<T> {
    list: ObservableList<T>,
    history: Rc<RefCell<UndoStack>>,
    serializer: Rc<dyn Serializer<T>>,
    _recorder: Rc<Subscription>,
}

impl<T> Clone for ObservableUndoableList<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            history: Rc::clone(&self.history),
            serializer: Rc::clone(&self.serializer),
            _recorder: Rc::clone(&self._recorder),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableUndoableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = self.history.borrow();
        f.debug_struct("ObservableUndoableList")
            .field("list", &self.list)
            .field("index", &history.index())
            .field("groups", &history.len())
            .finish()
    }
}

impl<T> Deref for ObservableUndoableList<T> {
    type Target = ObservableList<T>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl<T: Clone + PartialEq + 'static> ObservableUndoableList<T> {
    /// Create an empty undoable list with unlimited history.
    #[must_use]
    pub fn new(serializer: impl Serializer<T> + 'static) -> Self {
        Self::with_list(ObservableList::new(), serializer, HistoryConfig::default())
    }
}

impl<T: Clone + 'static> ObservableUndoableList<T> {
    /// Wrap an existing list. Only changes made from now on are recorded.
    #[must_use]
    pub fn with_list(
        list: ObservableList<T>,
        serializer: impl Serializer<T> + 'static,
        config: HistoryConfig,
    ) -> Self {
        let history = Rc::new(RefCell::new(UndoStack::new(config)));
        let serializer: Rc<dyn Serializer<T>> = Rc::new(serializer);
        let recorder = {
            let history = Rc::clone(&history);
            let serializer = Rc::clone(&serializer);
            list.changed().connect(move |sender, change| {
                record_change(&history, serializer.as_ref(), sender, change);
            })
        };
        Self {
            list,
            history,
            serializer,
            _recorder: Rc::new(recorder),
        }
    }

    /// The wrapped list.
    #[must_use]
    pub fn list(&self) -> &ObservableList<T> {
        &self.list
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.borrow().can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.borrow().can_redo()
    }

    /// Position of the most recently applied group, `-1` if none.
    #[must_use]
    pub fn history_index(&self) -> isize {
        self.history.borrow().index()
    }

    /// Copy of the recorded change log.
    #[must_use]
    pub fn history(&self) -> HistorySnapshot {
        self.history.borrow().snapshot()
    }

    #[must_use]
    pub fn history_config(&self) -> HistoryConfig {
        *self.history.borrow().config()
    }

    /// Start grouping changes into one undo step.
    ///
    /// With `undoable == false` the changes are made but not recorded.
    pub fn begin_compound_operation(&self, undoable: bool) {
        tracing::debug!(undoable, "compound operation started");
        self.history.borrow_mut().begin_compound(undoable);
    }

    /// Finish the current compound operation.
    pub fn end_compound_operation(&self) {
        self.history.borrow_mut().end_compound();
        tracing::debug!("compound operation ended");
    }

    /// Begin a compound operation that ends when the guard is dropped.
    pub fn compound(&self, undoable: bool) -> CompoundOperation {
        self.begin_compound_operation(undoable);
        CompoundOperation {
            history: Rc::clone(&self.history),
        }
    }

    /// Revert the most recently applied group. No-op if there is none.
    ///
    /// An open compound operation is ended first, so its changes are what
    /// gets reverted.
    ///
    /// # Errors
    ///
    /// Fails if a recorded entry cannot be decoded or no longer addresses a
    /// valid slot; `index` is then left unchanged.
    pub fn undo(&self) -> ModelResult<()> {
        self.close_open_compound();
        let group = self.history.borrow().undo_group().cloned();
        let Some(group) = group else {
            return Ok(());
        };
        {
            let _guard = ReplayGuard::suspend(&self.history);
            for change in group.iter().rev() {
                self.undo_change(change)?;
            }
        }
        self.history.borrow_mut().step_back();
        tracing::debug!(index = self.history_index(), records = group.len(), "undo");
        Ok(())
    }

    /// Re-apply the next undone group. No-op if there is none.
    ///
    /// Ends an open compound operation first, like [`undo`](Self::undo).
    ///
    /// # Errors
    ///
    /// Same as [`undo`](Self::undo).
    pub fn redo(&self) -> ModelResult<()> {
        self.close_open_compound();
        let group = self.history.borrow().redo_group().cloned();
        let Some(group) = group else {
            return Ok(());
        };
        self.history.borrow_mut().step_forward();
        let replayed = {
            let _guard = ReplayGuard::suspend(&self.history);
            group.iter().try_for_each(|change| self.redo_change(change))
        };
        if let Err(err) = replayed {
            self.history.borrow_mut().step_back();
            return Err(err);
        }
        tracing::debug!(index = self.history_index(), records = group.len(), "redo");
        Ok(())
    }

    /// Forget all history. The list contents are not touched.
    pub fn clear_undo(&self) {
        self.history.borrow_mut().clear();
        tracing::debug!("undo history cleared");
    }

    fn close_open_compound(&self) {
        if self.history.borrow().in_compound() {
            tracing::debug!("undo/redo inside a compound operation; ending it");
            self.end_compound_operation();
        }
    }

    fn decode(&self, values: &[Value]) -> ModelResult<Vec<T>> {
        values
            .iter()
            .map(|json| self.serializer.from_json(json))
            .collect()
    }

    fn set_from(&self, start: usize, values: &[Value]) -> ModelResult<()> {
        for (offset, value) in self.decode(values)?.into_iter().enumerate() {
            self.list.set(start + offset, value)?;
        }
        Ok(())
    }

    fn undo_change(&self, change: &ChangeRecord) -> ModelResult<()> {
        match change.kind {
            ListChangeKind::Add => {
                let start = position(change.new_index)?;
                self.list
                    .remove_range(start, start + change.new_values.len());
            }
            ListChangeKind::Set => self.set_from(position(change.old_index)?, &change.old_values)?,
            ListChangeKind::Remove => {
                let values = self.decode(&change.old_values)?;
                self.list.insert_all(position(change.old_index)?, values);
            }
            ListChangeKind::Move => self
                .list
                .move_item(position(change.new_index)?, position(change.old_index)?),
            ListChangeKind::Clear => {
                let values = self.decode(&change.old_values)?;
                self.list.insert_all(0, values);
            }
        }
        Ok(())
    }

    fn redo_change(&self, change: &ChangeRecord) -> ModelResult<()> {
        match change.kind {
            ListChangeKind::Add => {
                let values = self.decode(&change.new_values)?;
                if change.is_push() {
                    self.list.push_all(values);
                } else {
                    self.list.insert_all(position(change.new_index)?, values);
                }
            }
            ListChangeKind::Set => self.set_from(position(change.new_index)?, &change.new_values)?,
            ListChangeKind::Remove => {
                let start = position(change.old_index)?;
                self.list
                    .remove_range(start, start + change.old_values.len());
            }
            ListChangeKind::Move => self
                .list
                .move_item(position(change.old_index)?, position(change.new_index)?),
            ListChangeKind::Clear => self.list.clear(),
        }
        Ok(())
    }
}

impl<T: Clone + 'static> Disposable for ObservableUndoableList<T> {
    fn dispose(&self) {
        if self.list.is_disposed() {
            return;
        }
        self.list.dispose();
        self.history.borrow_mut().clear();
    }

    fn is_disposed(&self) -> bool {
        self.list.is_disposed()
    }
}
