//! Observable key-value store with watcher fan-out.
//!
//! [`Reactive`] is the composition root: it owns the watcher registry and the
//! active [`Store`]. Creating a new store replaces the active one but keeps
//! every registered watcher.
//!
//! # Invariants
//!
//! 1. Every write notifies each matching watcher exactly once, in
//!    registration order, with the written key.
//! 2. Writes made from inside a watcher are applied immediately; their
//!    notifications are queued and drained FIFO by the outermost write.
//! 3. A watcher error stops the fan-out and is returned to the writer. Queued
//!    notifications from the same cascade are discarded.
//! 4. State is plain data: the initial state is structurally cloned through
//!    `serde_json::Value` and must serialize to an object.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

/// Callback invoked with the written key and the store that was written.
pub type WatchFn = dyn Fn(&str, &Store) -> Result<()>;

/// Handle for removing a watcher with [`Reactive::unwatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

/// Store tuning (TOML `[store]` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Notifications one outermost write may drain, including its own.
    pub max_cascade: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_cascade: 100 }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_cascade == 0 {
            bail!("store.max_cascade must be > 0");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No store created yet.
    Uninitialized,
    /// A store exists and accepts writes.
    Active,
}

struct Watcher {
    id: WatchId,
    callback: Rc<WatchFn>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    global: Vec<Watcher>,
    keyed: HashMap<String, Vec<Watcher>>,
}

impl Registry {
    fn insert(&mut self, key: Option<&str>, callback: Rc<WatchFn>) -> WatchId {
        let id = WatchId(self.next_id);
        self.next_id += 1;
        let watcher = Watcher { id, callback };
        match key {
            Some(key) => self.keyed.entry(key.to_string()).or_default().push(watcher),
            None => self.global.push(watcher),
        }
        id
    }

    fn remove(&mut self, id: WatchId) -> bool {
        if let Some(pos) = self.global.iter().position(|w| w.id == id) {
            self.global.remove(pos);
            return true;
        }
        let mut emptied = None;
        let mut removed = false;
        for (key, watchers) in &mut self.keyed {
            if let Some(pos) = watchers.iter().position(|w| w.id == id) {
                watchers.remove(pos);
                removed = true;
                if watchers.is_empty() {
                    emptied = Some(key.clone());
                }
                break;
            }
        }
        if let Some(key) = emptied {
            self.keyed.remove(&key);
        }
        removed
    }

    /// Callbacks interested in `key`, in registration order.
    fn matching(&self, key: &str) -> Vec<Rc<WatchFn>> {
        let keyed = self.keyed.get(key).map_or(&[][..], Vec::as_slice);
        let mut hits: Vec<&Watcher> = self.global.iter().chain(keyed).collect();
        hits.sort_by_key(|w| w.id);
        hits.into_iter().map(|w| Rc::clone(&w.callback)).collect()
    }

    fn len(&self) -> usize {
        self.global.len() + self.keyed.values().map(Vec::len).sum::<usize>()
    }
}

/// Owner of the watcher registry and the active store.
pub struct Reactive {
    watchers: Rc<RefCell<Registry>>,
    store: Option<Store>,
    config: StoreConfig,
}

impl Default for Reactive {
    fn default() -> Self {
        Self {
            watchers: Rc::new(RefCell::new(Registry::default())),
            store: None,
            config: StoreConfig::default(),
        }
    }
}

impl Reactive {
    /// Owner with custom store tuning. Fails if `config` is invalid.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Clone `initial` into a fresh store and make it the active one.
    ///
    /// Previously registered watchers stay registered and fire for writes to
    /// the new store. Handles to the replaced store keep working.
    pub fn create_store<T: Serialize + ?Sized>(&mut self, initial: &T) -> Result<Store> {
        let state = match serde_json::to_value(initial).context("snapshot initial state")? {
            Value::Object(map) => map,
            other => bail!(
                "initial state must be an object, got {}",
                value_kind(&other)
            ),
        };
        debug!(
            keys = state.len(),
            watchers = self.watcher_count(),
            replaced = self.store.is_some(),
            "creating store"
        );
        let store = Store {
            inner: Rc::new(StoreInner {
                state: RefCell::new(state),
                watchers: Rc::clone(&self.watchers),
                dispatch: RefCell::new(Dispatch::default()),
                max_cascade: self.config.max_cascade,
            }),
        };
        self.store = Some(store.clone());
        Ok(store)
    }

    /// The active store, if one was created.
    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.store {
            Some(_) => Lifecycle::Active,
            None => Lifecycle::Uninitialized,
        }
    }

    /// Register a watcher fired for every write, whatever the key.
    pub fn watch<F>(&self, callback: F) -> WatchId
    where
        F: Fn(&str, &Store) -> Result<()> + 'static,
    {
        self.watchers.borrow_mut().insert(None, Rc::new(callback))
    }

    /// Register a watcher fired only for writes to `key`.
    pub fn watch_key<F>(&self, key: &str, callback: F) -> WatchId
    where
        F: Fn(&str, &Store) -> Result<()> + 'static,
    {
        self.watchers.borrow_mut().insert(Some(key), Rc::new(callback))
    }

    /// Remove a watcher. Returns false if it was already gone.
    pub fn unwatch(&self, id: WatchId) -> bool {
        self.watchers.borrow_mut().remove(id)
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

#[derive(Default)]
struct Dispatch {
    pending: VecDeque<String>,
    draining: bool,
}

struct StoreInner {
    state: RefCell<Map<String, Value>>,
    watchers: Rc<RefCell<Registry>>,
    dispatch: RefCell<Dispatch>,
    max_cascade: usize,
}

/// Shared handle to one store. Clones observe the same state.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.state.borrow().get(key).cloned()
    }

    /// Copy of the whole state as an object value.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.inner.state.borrow().clone())
    }

    /// Write `value` under `key` and notify watchers.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("serialize value for '{}'", key))?;
        self.inner
            .state
            .borrow_mut()
            .insert(key.to_string(), value);

        {
            let mut dispatch = self.inner.dispatch.borrow_mut();
            dispatch.pending.push_back(key.to_string());
            if dispatch.draining {
                trace!(key, "queued re-entrant notification");
                return Ok(());
            }
            dispatch.draining = true;
        }

        let result = self.drain();
        let mut dispatch = self.inner.dispatch.borrow_mut();
        dispatch.draining = false;
        dispatch.pending.clear();
        result
    }

    fn drain(&self) -> Result<()> {
        let mut delivered = 0usize;
        loop {
            let next = self.inner.dispatch.borrow_mut().pending.pop_front();
            let Some(key) = next else {
                return Ok(());
            };
            delivered += 1;
            if delivered > self.inner.max_cascade {
                warn!(
                    key = %key,
                    limit = self.inner.max_cascade,
                    "notification cascade limit reached"
                );
                bail!(
                    "notification cascade exceeded {} writes (last key '{}')",
                    self.inner.max_cascade,
                    key
                );
            }
            let callbacks = self.inner.watchers.borrow().matching(&key);
            for callback in callbacks {
                callback(&key, self).with_context(|| format!("watcher failed on '{}'", key))?;
            }
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
