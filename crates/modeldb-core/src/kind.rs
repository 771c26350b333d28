#![forbid(unsafe_code)]

//! Capabilities shared by every observable primitive.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime tag naming which primitive an observable is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservableKind {
    Map,
    List,
    String,
    Value,
}

impl ObservableKind {
    /// Stable name of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Map => "Map",
            Self::List => "List",
            Self::String => "String",
            Self::Value => "Value",
        }
    }
}

impl fmt::Display for ObservableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something with an explicit, idempotent teardown.
///
/// Observables are shared handles, so disposal goes through `&self`.
/// After `dispose` returns, the object emits no further change signals and
/// its storage is cleared. Calling `dispose` again does nothing.
pub trait Disposable {
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}
