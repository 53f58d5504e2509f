//! Listener registry
//!
//! Pure bookkeeping for one adapter: generic event → listener records, newest
//! first, plus the single relay each non-synthetic event keeps registered on
//! the backend. Backend calls are made by the caller with what this returns.

use std::collections::HashMap;

use crate::events::is_synthetic;
use crate::{Listener, ListenerRecord, Listeners};

/// Event surface of a backend player
///
/// Mirrors `on`/`off` of the backend SDKs: handlers are removed by identity.
pub trait NativeEvents: Send + Sync {
    fn add_listener(&self, event: &str, handler: Listener);
    fn remove_listener(&self, event: &str, handler: &Listener);
}

/// A relay registered on the backend on behalf of every listener of one event
#[derive(Debug, Clone, PartialEq)]
pub struct Relay {
    /// Backend-native event name the relay is registered under
    pub native: String,
    pub handler: Listener,
}

/// Listener records and relays of one adapter
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: Listeners,
    relays: HashMap<String, Relay>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `event` has a listener list
    pub fn has_event(&self, event: &str) -> bool {
        self.listeners.contains_key(event)
    }

    /// Whether `event` needs a relay created before its first listener is added
    pub fn needs_relay(&self, event: &str) -> bool {
        !self.has_event(event) && !is_synthetic(event)
    }

    /// Add a record at the front of the list of `event`
    pub fn insert(&mut self, event: &str, record: ListenerRecord) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .insert(0, record);
    }

    /// Remember the relay registered for `event`
    pub fn set_relay(&mut self, event: &str, relay: Relay) {
        self.relays.insert(event.to_string(), relay);
    }

    /// Remove the first record of `event` whose callback is `callback`
    ///
    /// When the list becomes empty it is deleted, and the relay that must now
    /// be deregistered from the backend is returned.
    pub fn remove(&mut self, event: &str, callback: &Listener) -> Option<Relay> {
        let list = self.listeners.get_mut(event)?;
        if let Some(index) = list.iter().position(|r| r.callback.same(callback)) {
            list.remove(index);
        }
        if !list.is_empty() {
            return None;
        }
        self.listeners.remove(event);
        self.relays.remove(event)
    }

    /// Records of `event` as they are now
    pub fn snapshot(&self, event: &str) -> Vec<ListenerRecord> {
        self.listeners.get(event).cloned().unwrap_or_default()
    }

    /// Every list, keyed by generic event
    pub fn listeners(&self) -> Listeners {
        self.listeners.clone()
    }

    pub fn relay_count(&self) -> usize {
        self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Empty both maps, returning the relays to deregister
    pub fn drain(&mut self) -> Vec<Relay> {
        self.listeners.clear();
        self.relays.drain().map(|(_, relay)| relay).collect()
    }
}
