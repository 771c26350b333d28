#![forbid(unsafe_code)]

//! Linear undo history over serialized list change records.
//!
//! [`UndoStack`] is the bookkeeping half of an undoable list: it decides
//! where each recorded change goes and which group `undo`/`redo` replay. It
//! never touches the list itself.
//!
//! # Model
//!
//! The history is a stack of *groups*; a group is the ordered list of change
//! records that undo or redo as one step. `index` points at the most recently
//! applied group (`-1` when none).
//!
//! ```text
//! record(a), record(b)          stack: [[a], [b]]        index: 1
//! undo()                        stack: [[a], [b]]        index: 0
//! record(c)  <-- new branch     stack: [[a], [c]]        index: 1
//!
//! begin_compound()
//! record(d), record(e)          stack: [[a], [c], [d, e]] index: 1
//! end_compound()                stack: [[a], [c], [d, e]] index: 2
//! ```
//!
//! # Invariants
//!
//! 1. `-1 <= index < stack.len()` outside a compound operation.
//! 2. Recording a change while no compound group is open first discards
//!    every group after `index` (the redo tail).
//! 3. Inside a compound operation all changes land in the group at
//!    `index + 1`, which is committed (advancing `index` once) only by
//!    `end_compound`, and only if something was recorded.
//! 4. `stack.len() <= config.max_depth` after any commit.

use modeldb_core::ListChange;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One serialized change record.
pub type ChangeRecord = ListChange<Value>;

/// Records that undo or redo as a single step.
pub type ChangeGroup = Vec<ChangeRecord>;

/// Configuration for an undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of committed groups kept. The oldest are evicted first.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl HistoryConfig {
    /// Create a configuration keeping at most `max_depth` groups.
    #[must_use]
    pub const fn bounded(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create a configuration that never evicts.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// Serializable snapshot of an undo history: the change log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub index: isize,
    pub stack: Vec<ChangeGroup>,
}

/// Undo/redo bookkeeping over serialized change groups.
#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Number of applied groups, i.e. `index + 1`.
    applied: usize,
    stack: Vec<ChangeGroup>,
    in_compound: bool,
    recording: bool,
    made_compound_change: bool,
    config: HistoryConfig,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl UndoStack {
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            applied: 0,
            stack: Vec::new(),
            in_compound: false,
            recording: true,
            made_compound_change: false,
            config,
        }
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Append a change to the history.
    ///
    /// Ignored while recording is switched off.
    pub fn record(&mut self, change: ChangeRecord) {
        if !self.recording {
            return;
        }
        if !self.in_compound || !self.made_compound_change {
            self.stack.truncate(self.applied);
        }
        match self.stack.get_mut(self.applied) {
            Some(group) => group.push(change),
            None => self.stack.push(vec![change]),
        }
        if self.in_compound {
            self.made_compound_change = true;
        } else {
            self.commit();
        }
    }

    /// Open a compound group. Changes recorded until
    /// [`end_compound`](Self::end_compound) form a single undo step.
    ///
    /// With `undoable == false`, changes made inside the bracket are not
    /// recorded at all. Nesting is not supported: a second `begin` simply
    /// restarts the bracket.
    ///
    /// Stepping back while a group is open leaves later records joining the
    /// group at the new position, so callers end the bracket before
    /// navigating.
    pub fn begin_compound(&mut self, undoable: bool) {
        self.in_compound = true;
        self.recording = undoable;
        self.made_compound_change = false;
    }

    /// Close the compound group, committing it if anything was recorded.
    pub fn end_compound(&mut self) {
        self.in_compound = false;
        self.recording = true;
        if std::mem::take(&mut self.made_compound_change) {
            self.commit();
        }
    }

    /// Switch recording on or off, returning the previous setting.
    pub fn set_recording(&mut self, recording: bool) -> bool {
        std::mem::replace(&mut self.recording, recording)
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    #[must_use]
    pub fn in_compound(&self) -> bool {
        self.in_compound
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.applied < self.committed_len()
    }

    /// The group `undo` would replay.
    #[must_use]
    pub fn undo_group(&self) -> Option<&ChangeGroup> {
        self.applied.checked_sub(1).and_then(|i| self.stack.get(i))
    }

    /// The group `redo` would replay.
    #[must_use]
    pub fn redo_group(&self) -> Option<&ChangeGroup> {
        if self.can_redo() {
            self.stack.get(self.applied)
        } else {
            None
        }
    }

    /// Move `index` one group back. No-op when nothing can be undone.
    pub fn step_back(&mut self) {
        self.applied = self.applied.saturating_sub(1);
    }

    /// Move `index` one group forward. No-op when nothing can be redone.
    pub fn step_forward(&mut self) {
        if self.can_redo() {
            self.applied += 1;
        }
    }

    /// Discard every group. Current list contents are not touched.
    pub fn clear(&mut self) {
        self.applied = 0;
        self.stack.clear();
        self.made_compound_change = false;
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// Position of the most recently applied group, `-1` if none.
    #[must_use]
    pub fn index(&self) -> isize {
        isize::try_from(self.applied).unwrap_or(isize::MAX) - 1
    }

    /// Number of groups, including an open compound group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    #[must_use]
    pub fn groups(&self) -> &[ChangeGroup] {
        &self.stack
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Copy of the index and every group.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            index: self.index(),
            stack: self.stack.clone(),
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Groups that can be redone; an open compound group is not one of them.
    fn committed_len(&self) -> usize {
        if self.in_compound && self.made_compound_change {
            self.stack.len().saturating_sub(1)
        } else {
            self.stack.len()
        }
    }

    fn commit(&mut self) {
        self.applied += 1;
        self.enforce_limits();
    }

    /// Evict the oldest applied groups beyond `max_depth`.
    fn enforce_limits(&mut self) {
        let excess = self.stack.len().saturating_sub(self.config.max_depth);
        let evict = excess.min(self.applied);
        if evict > 0 {
            self.stack.drain(..evict);
            self.applied -= evict;
            tracing::debug!(evicted = evict, "undo history trimmed");
        }
    }
}
