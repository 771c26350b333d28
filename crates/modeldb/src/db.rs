#![forbid(unsafe_code)]

//! Path-addressed registry of observables.
//!
//! A root [`ModelDb`] owns one backing [`ObservableMap`] keyed by fully
//! resolved dotted paths. [`ModelDb::view`] hands out children that prefix
//! every path with their base path and write into the same backing map, so
//! anything created through a view is visible from the root and from sibling
//! views.
//!
//! # Ownership
//!
//! ```text
//! root ── owns ──> backing map
//!   │                 ▲
//!   ├── tracks ──> view "cell1" ── shares ─┘
//!   └── tracks ──> observables it created
//! ```
//!
//! Disposing a database disposes the views it handed out and the observables
//! it created, removing those from the backing map. Only the root disposes
//! the backing map itself.
//!
//! Paths are opaque keys joined with `.`. There is no escaping, so a literal
//! `.` inside a segment cannot be expressed.
//!
//! Observables stored with [`ModelDb::set`] stay caller-owned: a later
//! `create_*` at the same path displaces them without disposing them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::{Ready, ready};
use std::rc::Rc;

use modeldb_core::{
    Disposable, ModelError, ModelResult, ObservableJson, ObservableKind, ObservableList,
    ObservableMap, ObservableString, ObservableValue, json_deep_equal,
};
use modeldb_undo::{IdentitySerializer, ObservableUndoableList};
use serde_json::Value;

use crate::config::{ModelDbConfig, RecreatePolicy};
use crate::observable::Observable;

struct DbInner {
    backing: ObservableMap<Observable>,
    owns_backing: bool,
    /// Fully resolved prefix, empty for none.
    prefix: String,
    config: ModelDbConfig,
    disposed: Cell<bool>,
    created: RefCell<Vec<(String, Observable)>>,
    views: RefCell<Vec<ModelDb>>,
    /// Caller-owned observables, shared by the root and all its views.
    external: Rc<RefCell<Vec<Observable>>>,
}

/// An in-memory, path-addressed store of observables.
///
/// Cloning clones the handle.
#[derive(Clone)]
pub struct ModelDb {
    inner: Rc<DbInner>,
}

impl fmt::Debug for ModelDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDb")
            .field("base_path", &self.inner.prefix)
            .field("root", &self.inner.owns_backing)
            .field("created", &self.inner.created.borrow().len())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl Default for ModelDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelDb {
    /// Create a root database with an empty backing map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ModelDbConfig::default())
    }

    #[must_use]
    pub fn with_config(config: ModelDbConfig) -> Self {
        let backing = ObservableMap::with_comparator(Observable::ptr_eq);
        let external = Rc::new(RefCell::new(Vec::new()));
        Self::build(backing, external, true, config.base_path.clone(), config)
    }

    fn build(
        backing: ObservableMap<Observable>,
        external: Rc<RefCell<Vec<Observable>>>,
        owns_backing: bool,
        prefix: String,
        config: ModelDbConfig,
    ) -> Self {
        Self {
            inner: Rc::new(DbInner {
                backing,
                owns_backing,
                prefix,
                config,
                disposed: Cell::new(false),
                created: RefCell::new(Vec::new()),
                views: RefCell::new(Vec::new()),
                external,
            }),
        }
    }

    // ========================================================================
    // Info
    // ========================================================================

    /// The base path this database was created with.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.inner.config.base_path
    }

    #[must_use]
    pub fn config(&self) -> &ModelDbConfig {
        &self.inner.config
    }

    /// Always `false`: this store has a single writer.
    #[must_use]
    pub const fn is_collaborative(&self) -> bool {
        false
    }

    /// Resolves immediately; the in-memory store has nothing to connect to.
    pub fn connected(&self) -> Ready<()> {
        ready(())
    }

    /// Full backing-map key for `path`.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if self.inner.prefix.is_empty() {
            path.to_string()
        } else {
            format!("{}.{path}", self.inner.prefix)
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// The observable stored at `path`, if any.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Observable> {
        if self.inner.disposed.get() {
            return None;
        }
        self.inner.backing.get(&self.resolve(path))
    }

    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        !self.inner.disposed.get() && self.inner.backing.has(&self.resolve(path))
    }

    /// Current JSON held by the value observable at `path`.
    ///
    /// # Errors
    ///
    /// [`ModelError::TypeMismatch`] if `path` holds no value observable,
    /// [`ModelError::Disposed`] after disposal.
    pub fn get_value(&self, path: &str) -> ModelResult<Value> {
        Ok(self.get_value_handle(path)?.get())
    }

    /// Write `value` into the value observable at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`get_value`](Self::get_value).
    pub fn set_value(&self, path: &str, value: Value) -> ModelResult<()> {
        self.get_value_handle(path)?.set(value);
        Ok(())
    }

    /// # Errors
    ///
    /// [`ModelError::TypeMismatch`] unless `path` holds a string.
    pub fn get_string(&self, path: &str) -> ModelResult<ObservableString> {
        self.typed(path, ObservableKind::String, |o| o.as_string().cloned())
    }

    /// # Errors
    ///
    /// [`ModelError::TypeMismatch`] unless `path` holds a list.
    pub fn get_list(&self, path: &str) -> ModelResult<ObservableUndoableList<Value>> {
        self.typed(path, ObservableKind::List, |o| o.as_list().cloned())
    }

    /// # Errors
    ///
    /// [`ModelError::TypeMismatch`] unless `path` holds a map.
    pub fn get_map(&self, path: &str) -> ModelResult<ObservableJson> {
        self.typed(path, ObservableKind::Map, |o| o.as_map().cloned())
    }

    /// # Errors
    ///
    /// [`ModelError::TypeMismatch`] unless `path` holds a value.
    pub fn get_value_handle(&self, path: &str) -> ModelResult<ObservableValue> {
        self.typed(path, ObservableKind::Value, |o| o.as_value().cloned())
    }

    fn typed<T>(
        &self,
        path: &str,
        expected: ObservableKind,
        extract: impl FnOnce(&Observable) -> Option<T>,
    ) -> ModelResult<T> {
        if self.inner.disposed.get() {
            return Err(ModelError::Disposed);
        }
        let resolved = self.resolve(path);
        let found = self.inner.backing.get(&resolved);
        match found.as_ref().and_then(extract) {
            Some(handle) => Ok(handle),
            None => Err(ModelError::type_mismatch(
                resolved,
                expected,
                found.as_ref().map(Observable::kind),
            )),
        }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an empty string at `path`.
    ///
    /// # Errors
    ///
    /// [`ModelError::Disposed`] after disposal; [`ModelError::PathOccupied`]
    /// if `path` is taken and the policy is [`RecreatePolicy::Reject`].
    pub fn create_string(&self, path: &str) -> ModelResult<ObservableString> {
        let text = ObservableString::default();
        self.register(path, Observable::String(text.clone()))?;
        Ok(text)
    }

    /// Create an empty undoable list of JSON values at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`create_string`](Self::create_string).
    pub fn create_list(&self, path: &str) -> ModelResult<ObservableUndoableList<Value>> {
        let list = ObservableUndoableList::with_list(
            ObservableList::with_comparator(json_deep_equal),
            IdentitySerializer,
            self.inner.config.history,
        );
        self.register(path, Observable::List(list.clone()))?;
        Ok(list)
    }

    /// Create an empty JSON map at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`create_string`](Self::create_string).
    pub fn create_map(&self, path: &str) -> ModelResult<ObservableJson> {
        let map = ObservableJson::new();
        self.register(path, Observable::Map(map.clone()))?;
        Ok(map)
    }

    /// Create a value holding `null` at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`create_string`](Self::create_string).
    pub fn create_value(&self, path: &str) -> ModelResult<ObservableValue> {
        let value = ObservableValue::default();
        self.register(path, Observable::Value(value.clone()))?;
        Ok(value)
    }

    /// Store an externally created observable at `path`, returning whatever
    /// it displaced.
    ///
    /// The caller keeps ownership: neither this database nor a later
    /// `create_*` at the same path will dispose it. The displaced observable
    /// is not disposed either.
    ///
    /// # Errors
    ///
    /// [`ModelError::Disposed`] after disposal.
    pub fn set(&self, path: &str, observable: Observable) -> ModelResult<Option<Observable>> {
        if self.inner.disposed.get() {
            return Err(ModelError::Disposed);
        }
        {
            let mut external = self.inner.external.borrow_mut();
            if !external.iter().any(|o| o.ptr_eq(&observable)) {
                external.push(observable.clone());
            }
        }
        let displaced = self
            .inner
            .backing
            .set(self.resolve(path), observable.clone());
        if let Some(old) = displaced.as_ref().filter(|old| !old.ptr_eq(&observable)) {
            self.release_external(old);
        }
        Ok(displaced)
    }

    /// Forget `observable` as caller-owned, returning whether it was.
    fn release_external(&self, observable: &Observable) -> bool {
        let mut external = self.inner.external.borrow_mut();
        let before = external.len();
        external.retain(|o| !o.ptr_eq(observable));
        external.len() != before
    }

    fn register(&self, path: &str, observable: Observable) -> ModelResult<()> {
        if self.inner.disposed.get() {
            return Err(ModelError::Disposed);
        }
        let resolved = self.resolve(path);
        if self.inner.config.recreate == RecreatePolicy::Reject
            && self.inner.backing.has(&resolved)
        {
            return Err(ModelError::PathOccupied(resolved));
        }
        tracing::debug!(path = %resolved, kind = %observable.kind(), "observable created");
        let displaced = self
            .inner
            .backing
            .set(resolved.clone(), observable.clone());
        {
            let mut created = self.inner.created.borrow_mut();
            created.retain(|(_, o)| !o.is_disposed());
            created.push((resolved, observable));
        }
        if let Some(old) = displaced {
            if self.release_external(&old) {
                tracing::debug!(kind = %old.kind(), "caller-owned observable displaced");
            } else {
                tracing::debug!(kind = %old.kind(), "displaced observable disposed");
                old.dispose();
            }
        }
        Ok(())
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// A child database rooted at `base_path` under this one.
    ///
    /// The view shares the backing map and is disposed with this database.
    ///
    /// # Errors
    ///
    /// [`ModelError::Disposed`] after disposal.
    pub fn view(&self, base_path: &str) -> ModelResult<ModelDb> {
        if self.inner.disposed.get() {
            return Err(ModelError::Disposed);
        }
        let prefix = if base_path.is_empty() {
            self.inner.prefix.clone()
        } else {
            self.resolve(base_path)
        };
        tracing::debug!(base_path = %prefix, "view created");
        let config = self.inner.config.clone().with_base_path(base_path);
        let view = Self::build(
            self.inner.backing.clone(),
            Rc::clone(&self.inner.external),
            false,
            prefix,
            config,
        );
        let mut views = self.inner.views.borrow_mut();
        views.retain(|v| !v.is_disposed());
        views.push(view.clone());
        Ok(view)
    }
}

impl Disposable for ModelDb {
    fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let views = std::mem::take(&mut *self.inner.views.borrow_mut());
        for view in &views {
            view.dispose();
        }
        let created = std::mem::take(&mut *self.inner.created.borrow_mut());
        for (path, observable) in &created {
            let current = self.inner.backing.get(path);
            if current.is_some_and(|c| c.ptr_eq(observable)) {
                self.inner.backing.delete(path);
            }
            observable.dispose();
        }
        if self.inner.owns_backing {
            self.inner.backing.dispose();
            self.inner.external.borrow_mut().clear();
        }
        tracing::debug!(
            base_path = %self.inner.prefix,
            views = views.len(),
            observables = created.len(),
            "model database disposed"
        );
    }

    fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modeldb_undo::HistoryConfig;
    use serde_json::json;

    #[test]
    fn view_writes_are_visible_from_root() {
        let db = ModelDb::new();
        let view = db.view("cell1").unwrap();
        view.create_value("trusted").unwrap();
        view.set_value("trusted", json!(true)).unwrap();

        assert_eq!(db.get_value("cell1.trusted").unwrap(), json!(true));
        assert!(db.has("cell1.trusted"));
        assert!(view.has("trusted"));
        assert!(!db.has("trusted"));
    }

    #[test]
    fn nested_views_chain_prefixes() {
        let db = ModelDb::with_config(ModelDbConfig::new().with_base_path("nb"));
        let outer = db.view("cells").unwrap();
        let inner = outer.view("0").unwrap();
        inner.create_string("source").unwrap();

        assert_eq!(inner.resolve("source"), "nb.cells.0.source");
        assert_eq!(inner.base_path(), "0");
        assert!(db.get("cells.0.source").is_some());
        assert!(outer.get_string("0.source").is_ok());
    }

    #[test]
    fn empty_view_base_reuses_prefix() {
        let db = ModelDb::new();
        let a = db.view("a").unwrap();
        let same = a.view("").unwrap();
        same.create_value("x").unwrap();

        assert_eq!(same.resolve("x"), "a.x");
        assert!(db.has("a.x"));
        assert!(a.has("x"));

        let root_alias = db.view("").unwrap();
        assert_eq!(root_alias.resolve("y"), "y");
    }

    #[test]
    fn sibling_views_share_storage() {
        let db = ModelDb::new();
        let a = db.view("shared").unwrap();
        let b = db.view("shared").unwrap();
        let map = a.create_map("meta").unwrap();
        map.set("k", json!(1));
        assert_eq!(b.get_map("meta").unwrap().get("k"), Some(json!(1)));
    }

    #[test]
    fn created_kinds() {
        let db = ModelDb::new();
        db.create_string("s").unwrap();
        db.create_list("l").unwrap();
        db.create_map("m").unwrap();
        db.create_value("v").unwrap();

        let kinds: Vec<_> = ["s", "l", "m", "v"]
            .iter()
            .map(|p| db.get(p).map(|o| o.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ObservableKind::String),
                Some(ObservableKind::List),
                Some(ObservableKind::Map),
                Some(ObservableKind::Value),
            ]
        );
        assert!(db.get("missing").is_none());
    }

    #[test]
    fn value_access_on_wrong_kind_fails() {
        let db = ModelDb::new();
        db.create_string("s").unwrap();

        let err = db.get_value("s").unwrap_err();
        assert!(matches!(
            err,
            ModelError::TypeMismatch {
                expected: ObservableKind::Value,
                found: Some(ObservableKind::String),
                ..
            }
        ));
        let err = db.set_value("missing", json!(1)).unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { found: None, .. }));
        assert!(db.get_list("s").is_err());
    }

    #[test]
    fn recreate_replaces_and_disposes() {
        let db = ModelDb::new();
        let first = db.create_value("v").unwrap();
        let second = db.create_value("v").unwrap();

        assert!(first.is_disposed());
        assert!(!second.is_disposed());
        assert!(db.get_value_handle("v").unwrap().ptr_eq(&second));
    }

    #[test]
    fn recreate_can_be_rejected() {
        let db = ModelDb::with_config(ModelDbConfig::new().with_recreate(RecreatePolicy::Reject));
        let first = db.create_value("v").unwrap();
        let err = db.create_string("v").unwrap_err();
        assert!(matches!(err, ModelError::PathOccupied(ref p) if p == "v"));
        assert!(!first.is_disposed());
    }

    #[test]
    fn set_registers_external_observable() {
        let db = ModelDb::new();
        let value = ObservableValue::new(json!("outside"));
        assert!(db.set("ext", value.clone().into()).unwrap().is_none());
        assert_eq!(db.get_value("ext").unwrap(), json!("outside"));

        db.dispose();
        assert!(!value.is_disposed());
    }

    #[test]
    fn create_over_set_leaves_caller_observable_alive() {
        let db = ModelDb::new();
        let mine = ObservableValue::new(json!("mine"));
        db.set("k", mine.clone().into()).unwrap();

        let created = db.create_value("k").unwrap();

        assert!(!mine.is_disposed());
        assert!(db.get_value_handle("k").unwrap().ptr_eq(&created));

        // Storing the same handle twice keeps it caller-owned.
        let again = ObservableValue::new(json!("again"));
        db.set("j", again.clone().into()).unwrap();
        db.set("j", again.clone().into()).unwrap();
        db.create_value("j").unwrap();
        assert!(!again.is_disposed());

        // Only what this database created is disposed on displacement.
        db.create_value("k").unwrap();
        assert!(created.is_disposed());
        assert!(!mine.is_disposed());
    }

    #[test]
    fn create_over_set_through_view_leaves_caller_observable_alive() {
        let db = ModelDb::new();
        let mine = ObservableString::new("ext");
        db.set("cell.source", mine.clone().into()).unwrap();

        let view = db.view("cell").unwrap();
        view.create_string("source").unwrap();

        assert!(!mine.is_disposed());
    }

    #[test]
    fn created_lists_are_undoable_with_configured_limits() {
        let db = ModelDb::with_config(ModelDbConfig::new().with_history(HistoryConfig::bounded(1)));
        let list = db.create_list("cells").unwrap();
        list.push(json!("a"));
        list.push(json!("b"));
        list.undo().unwrap();
        list.undo().unwrap();
        assert_eq!(list.to_vec(), vec![json!("a")]);
        assert_eq!(list.history_config().max_depth, 1);
    }

    #[test]
    fn disposing_view_removes_only_its_observables() {
        let db = ModelDb::new();
        let root_value = db.create_value("top").unwrap();
        let view = db.view("cell").unwrap();
        let text = view.create_string("source").unwrap();

        view.dispose();

        assert!(text.is_disposed());
        assert!(!db.has("cell.source"));
        assert!(!root_value.is_disposed());
        assert!(db.has("top"));
        assert!(!db.is_disposed());
    }

    #[test]
    fn disposing_root_disposes_everything() {
        let db = ModelDb::new();
        let view = db.view("a").unwrap();
        let list = view.create_list("l").unwrap();
        let map = db.create_map("m").unwrap();

        db.dispose();
        db.dispose();

        assert!(db.is_disposed());
        assert!(view.is_disposed());
        assert!(list.is_disposed());
        assert!(map.is_disposed());
        assert!(db.get("m").is_none());
        assert!(!db.has("a.l"));
    }

    #[test]
    fn disposed_database_rejects_writes() {
        let db = ModelDb::new();
        db.dispose();
        assert!(matches!(db.create_value("v"), Err(ModelError::Disposed)));
        assert!(matches!(db.view("x"), Err(ModelError::Disposed)));
        assert!(matches!(db.get_value("v"), Err(ModelError::Disposed)));
        assert!(matches!(
            db.set("v", ObservableValue::default().into()),
            Err(ModelError::Disposed)
        ));
    }

    #[test]
    fn replaced_observable_outlives_view_dispose_of_original() {
        let db = ModelDb::new();
        let view = db.view("c").unwrap();
        view.create_value("v").unwrap();
        let replacement = db.create_value("c.v").unwrap();

        view.dispose();

        assert!(!replacement.is_disposed());
        assert!(db.get_value_handle("c.v").unwrap().ptr_eq(&replacement));
    }

    #[test]
    fn in_memory_flags() {
        let db = ModelDb::new();
        assert!(!db.is_collaborative());
        assert_eq!(db.base_path(), "");
        let _ready: Ready<()> = db.connected();
    }
}
