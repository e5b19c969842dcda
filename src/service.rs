// ===============================
// src/service.rs (keyed store + listener fan-out)
// ===============================
//
// Every desk service is a `KeyedService<K, V>`: the latest value per key plus
// an ordered list of listeners. Publishing is synchronous: each listener (and
// everything it forwards into) runs to completion before the next one starts,
// and the first listener error stops the fan-out and is returned. A service
// commits its own write before fanning out; a downstream error never undoes it.
//
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use ahash::AHashMap as HashMap;
use tracing::debug;

use crate::error::DeskError;
use crate::metrics::PUBLISHES;

/// A value that knows the key it is stored under.
pub trait Keyed<K> {
    fn key(&self) -> K;
}

/// Subscriber to one keyed service.
pub trait ServiceListener<V> {
    fn process_add(&self, data: &V) -> Result<(), DeskError>;

    fn process_update(&self, _data: &V) -> Result<(), DeskError> {
        Ok(())
    }

    fn process_remove(&self, _data: &V) -> Result<(), DeskError> {
        Ok(())
    }
}

pub type Listener<V> = Rc<dyn ServiceListener<V>>;

pub struct KeyedService<K, V> {
    kind: &'static str,
    store: HashMap<K, V>,
    listeners: Vec<Listener<V>>,
}

impl<K, V> KeyedService<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Keyed<K> + Clone,
{
    pub fn new(kind: &'static str) -> Self {
        Self { kind, store: HashMap::new(), listeners: Vec::new() }
    }

    pub fn get(&self, key: &K) -> Result<&V, DeskError> {
        self.store
            .get(key)
            .ok_or_else(|| DeskError::unknown(self.kind, key.to_string()))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.store.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.store.values()
    }

    /// Overwrite without notifying anyone.
    pub fn put(&mut self, value: V) -> Option<V> {
        self.store.insert(value.key(), value)
    }

    /// Store (last write wins), then run every listener's add hook in order.
    /// The write is kept when a listener fails.
    pub fn publish(&mut self, value: V) -> Result<(), DeskError> {
        self.put(value.clone());
        self.notify_add(&value)
    }

    /// Like `publish`, but refuses a key that is already stored.
    pub fn insert_unique(&mut self, value: V) -> Result<(), DeskError> {
        let key = value.key();
        if self.store.contains_key(&key) {
            return Err(DeskError::duplicate(self.kind, key.to_string()));
        }
        self.publish(value)
    }

    /// Overwrite an existing key and run every listener's update hook.
    pub fn publish_update(&mut self, value: V) -> Result<(), DeskError> {
        let key = value.key();
        if !self.store.contains_key(&key) {
            return Err(DeskError::unknown(self.kind, key.to_string()));
        }
        self.put(value.clone());
        PUBLISHES.with_label_values(&[self.kind]).inc();
        for listener in &self.listeners {
            listener.process_update(&value)?;
        }
        Ok(())
    }

    /// Drop a key and run every listener's remove hook with the old value.
    pub fn remove(&mut self, key: &K) -> Result<V, DeskError> {
        let old = self
            .store
            .remove(key)
            .ok_or_else(|| DeskError::unknown(self.kind, key.to_string()))?;
        for listener in &self.listeners {
            listener.process_remove(&old)?;
        }
        Ok(old)
    }

    /// Fan a value out to the add hooks without touching the store.
    pub fn notify_add(&self, value: &V) -> Result<(), DeskError> {
        PUBLISHES.with_label_values(&[self.kind]).inc();
        debug!(service = self.kind, key = %value.key(), listeners = self.listeners.len(), "publish");
        for listener in &self.listeners {
            listener.process_add(value)?;
        }
        Ok(())
    }

    pub fn add_listener(&mut self, listener: Listener<V>) {
        self.listeners.push(listener);
    }
}
