//! Reactive watch store
//!
//! A fixed set of observable properties with ordered change notification.
//! `set_value`/`set_many` are the only mutation paths. Updates issued from
//! inside a notification are queued and applied once the current round of
//! notifications has finished, so every observer sees the same total order
//! of transitions.

use crate::{Error, Result};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

/// Watchable property names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKey {
    IsFullscreen,
    FullscreenElement,
}

impl WatchKey {
    pub const ALL: [WatchKey; 2] = [WatchKey::IsFullscreen, WatchKey::FullscreenElement];

    pub fn as_str(&self) -> &'static str {
        match self {
            WatchKey::IsFullscreen => "isFullscreen",
            WatchKey::FullscreenElement => "fullscreenElement",
        }
    }

    /// Value before the first transition. `null` stands for "unset".
    fn initial_value(&self) -> Value {
        match self {
            WatchKey::IsFullscreen => Value::Bool(false),
            WatchKey::FullscreenElement => Value::Null,
        }
    }
}

impl FromStr for WatchKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "isFullscreen" => Ok(WatchKey::IsFullscreen),
            "fullscreenElement" => Ok(WatchKey::FullscreenElement),
            other => Err(Error::UnknownProperty(other.to_string())),
        }
    }
}

impl std::fmt::Display for WatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change callback, called with `(new_value, old_value)`
pub type WatchCallback = Rc<dyn Fn(&Value, &Value)>;

/// Token returned by [`WatchStore::watch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(u64);

/// Observable property store
pub struct WatchStore {
    values: RefCell<HashMap<WatchKey, Value>>,
    subscribers: RefCell<HashMap<WatchKey, Vec<(WatchId, WatchCallback)>>>,
    pending: RefCell<VecDeque<Vec<(WatchKey, Value)>>>,
    notifying: Cell<bool>,
    next_id: Cell<u64>,
}

impl WatchStore {
    pub fn new() -> Self {
        let values = WatchKey::ALL
            .iter()
            .map(|key| (*key, key.initial_value()))
            .collect();

        Self {
            values: RefCell::new(values),
            subscribers: RefCell::new(HashMap::new()),
            pending: RefCell::new(VecDeque::new()),
            notifying: Cell::new(false),
            next_id: Cell::new(0),
        }
    }

    /// Register a change callback for a named property
    pub fn watch<F>(&self, name: &str, callback: F) -> Result<WatchId>
    where
        F: Fn(&Value, &Value) + 'static,
    {
        let key: WatchKey = name.parse()?;
        let id = WatchId(self.next_id.get() + 1);
        self.next_id.set(id.0);

        self.subscribers
            .borrow_mut()
            .entry(key)
            .or_default()
            .push((id, Rc::new(callback)));
        Ok(id)
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unwatch(&self, name: &str, id: WatchId) -> Result<bool> {
        let key: WatchKey = name.parse()?;
        let mut subscribers = self.subscribers.borrow_mut();
        let Some(list) = subscribers.get_mut(&key) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        Ok(list.len() != before)
    }

    pub fn get(&self, key: WatchKey) -> Value {
        self.values
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn subscriber_count(&self, key: WatchKey) -> usize {
        self.subscribers.borrow().get(&key).map_or(0, Vec::len)
    }

    pub fn set_value(&self, key: WatchKey, value: Value) {
        self.set_many(vec![(key, value)]);
    }

    /// Store all values first, then notify in the given order
    pub fn set_many(&self, updates: Vec<(WatchKey, Value)>) {
        self.pending.borrow_mut().push_back(updates);
        if self.notifying.get() {
            return;
        }

        let _guard = NotifyGuard::enter(self);
        loop {
            let Some(batch) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            self.apply(batch);
        }
    }

    /// Drop every subscriber
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }

    fn apply(&self, batch: Vec<(WatchKey, Value)>) {
        let mut changes = Vec::with_capacity(batch.len());
        {
            let mut values = self.values.borrow_mut();
            for (key, value) in batch {
                let old = values.insert(key, value.clone()).unwrap_or(Value::Null);
                if old != value {
                    changes.push((key, value, old));
                }
            }
        }

        for (key, new, old) in changes {
            debug!(property = %key, new = %new, old = %old, "Watched property changed");
            let callbacks: Vec<WatchCallback> = self
                .subscribers
                .borrow()
                .get(&key)
                .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default();

            for callback in callbacks {
                callback(&new, &old);
            }
        }
    }
}

impl Default for WatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStore")
            .field("values", &self.values.borrow())
            .field("notifying", &self.notifying.get())
            .finish_non_exhaustive()
    }
}

/// Resets the notifying flag and drops unapplied batches even if a callback
/// panics
struct NotifyGuard<'a>(&'a WatchStore);

impl<'a> NotifyGuard<'a> {
    fn enter(store: &'a WatchStore) -> Self {
        store.notifying.set(true);
        Self(store)
    }
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        self.0.notifying.set(false);
        self.0.pending.borrow_mut().clear();
    }
}
