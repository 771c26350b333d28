#![forbid(unsafe_code)]

//! Undo: linear, serializable undo/redo for observable lists.
//!
//! # Role in the model database
//! `modeldb-undo` turns the change records of an
//! [`ObservableList`](modeldb_core::ObservableList) into a replayable
//! history. It never inspects list items directly; a [`Serializer`] copies
//! them to JSON on the way in and rebuilds them on replay.
//!
//! # Primary responsibilities
//! - **UndoStack**: where each change lands, compound grouping, the redo
//!   tail and depth limits.
//! - **ObservableUndoableList**: records its own changes and replays them.
//! - **Serializer**: JSON copies of items, identity or `serde`-driven.
//!
//! # How it fits in the system
//! `modeldb` creates every list path as an
//! `ObservableUndoableList<serde_json::Value>` with [`IdentitySerializer`].

pub mod history;
pub mod serializer;
pub mod undoable;

pub use history::{ChangeGroup, ChangeRecord, HistoryConfig, HistorySnapshot, UndoStack};
pub use serializer::{IdentitySerializer, SerdeSerializer, Serializer};
pub use undoable::{CompoundOperation, ObservableUndoableList};
