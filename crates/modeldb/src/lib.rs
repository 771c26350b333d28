#![forbid(unsafe_code)]

//! Public facade for the observable model database.
//!
//! # Role in the model database
//! `modeldb` is the entry point for applications. It re-exports the
//! observable primitives and the undoable list, and adds [`ModelDb`], which
//! creates them under dotted paths and hands out prefixed views over one
//! shared store.
//!
//! # How it fits in the system
//! Dependency order is `modeldb-core` -> `modeldb-undo` -> `modeldb`.
//! Everything is single-threaded and synchronous: a mutation has notified
//! every subscriber by the time it returns.
//!
//! ```ignore
//! let db = ModelDb::new();
//! let cell = db.view("cell1")?;
//! cell.create_value("trusted")?;
//! cell.set_value("trusted", json!(true))?;
//! assert_eq!(db.get_value("cell1.trusted")?, json!(true));
//! ```

pub mod config;
pub mod db;
pub mod observable;

pub use config::{ModelDbConfig, RecreatePolicy};
pub use db::ModelDb;
pub use observable::Observable;

pub use modeldb_core::{
    Disposable, JsonObject, ListChange, ListChangeKind, MapChange, MapChangeKind, ModelError,
    ModelResult, ObservableJson, ObservableKind, ObservableList, ObservableMap, ObservableString,
    ObservableValue, Signal, StringChange, StringChangeKind, Subscription, ValueChange,
    json_deep_equal,
};
pub use modeldb_undo::{
    CompoundOperation, HistoryConfig, HistorySnapshot, IdentitySerializer, ObservableUndoableList,
    SerdeSerializer, Serializer,
};
