#![forbid(unsafe_code)]

//! Error taxonomy for the model database.
//!
//! Every error is raised synchronously at the call that breaks a contract.
//! Redundant writes, removal of absent keys and degenerate moves are not
//! errors: they are silent no-ops and never reach this type.

use crate::kind::ObservableKind;

/// Result alias used throughout the workspace.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by observable containers and the model database.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A value was written into a slot that does not exist.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The path does not hold an observable of the expected kind.
    #[error("path '{path}' holds {}, expected {expected}", describe(.found))]
    TypeMismatch {
        path: String,
        expected: ObservableKind,
        found: Option<ObservableKind>,
    },

    /// A `create_*` call targeted a path that is already occupied.
    #[error("path '{0}' is already occupied")]
    PathOccupied(String),

    /// The model database has been disposed.
    #[error("model database is disposed")]
    Disposed,

    /// A value could not be converted to or from its JSON form.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe(found: &Option<ObservableKind>) -> String {
    match found {
        Some(kind) => format!("a {kind}"),
        None => "nothing".to_string(),
    }
}

impl ModelError {
    /// Build the error for a list write past the end of the list.
    #[must_use]
    pub fn slot_out_of_range(index: usize, length: usize) -> Self {
        Self::InvalidValue(format!(
            "no slot at index {index} (length {length}); use insert or push"
        ))
    }

    /// Build a [`ModelError::TypeMismatch`].
    #[must_use]
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: ObservableKind,
        found: Option<ObservableKind>,
    ) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }
}
