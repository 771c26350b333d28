#![forbid(unsafe_code)]

//! Core: observable primitives and the change signal they share.
//!
//! # Role in the model database
//! `modeldb-core` holds the leaf types. Every container here is a shared
//! handle over single-threaded interior state, mutated synchronously, and
//! announcing each mutation through a [`Signal`] before the call returns.
//!
//! # Primary responsibilities
//! - **Signal**: ordered, synchronous publish/subscribe with RAII
//!   [`Subscription`] guards.
//! - **ObservableMap / ObservableJson**: string-keyed dictionaries, the JSON
//!   flavour using deep equality.
//! - **ObservableList**: index-addressed sequence with replayable change
//!   records.
//! - **ObservableString / ObservableValue**: text buffer and single JSON
//!   value.
//!
//! # How it fits in the system
//! `modeldb-undo` listens to [`ObservableList`] change records to build its
//! history, and `modeldb` registers all of these under dotted paths.

pub mod error;
pub mod json;
pub mod kind;
pub mod list;
pub mod map;
pub mod signal;
pub mod string;
pub mod value;

pub use error::{ModelError, ModelResult};
pub use json::{JsonObject, ObservableJson, json_deep_equal};
pub use kind::{Disposable, ObservableKind};
pub use list::{INSERT_INDEX, ListChange, ListChangeKind, NO_INDEX, ObservableList, PUSH_INDEX};
pub use map::{Comparator, MapChange, MapChangeKind, ObservableMap};
pub use signal::{Signal, Subscription};
pub use string::{ObservableString, StringChange, StringChangeKind};
pub use value::{ObservableValue, ValueChange};
