#![forbid(unsafe_code)]

//! Model database configuration.

use modeldb_undo::HistoryConfig;

/// What `create_*` does when the target path already holds an observable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecreatePolicy {
    /// Store the new observable and dispose the one it displaces.
    #[default]
    Replace,
    /// Fail with [`ModelError::PathOccupied`](modeldb_core::ModelError::PathOccupied).
    Reject,
}

/// Configuration for a root [`ModelDb`](crate::ModelDb).
///
/// Views inherit everything except `base_path`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelDbConfig {
    /// Prefix joined with `.` in front of every path. Empty for none.
    pub base_path: String,
    pub recreate: RecreatePolicy,
    /// Limits for lists created by `create_list`.
    pub history: HistoryConfig,
}

impl ModelDbConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn with_recreate(mut self, recreate: RecreatePolicy) -> Self {
        self.recreate = recreate;
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }
}
