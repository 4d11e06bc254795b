//! In-memory doubles for the client's persistence and signaling seams.
//!
//! - [`InMemoryKeyValueStore`]: stands in for browser local storage
//! - [`RecordingSignalBus`]: delivers signals like the real bus and keeps a
//!   log so tests can assert what was published

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poison only follows a panicking test

use async_stream::stream;
use sorteohub_core::environment::KeyValueStore;
use sorteohub_core::signal_bus::{SignalBus, SignalBusError, SignalStream};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// In-memory key-value store.
///
/// Clones share the same map, so a test can keep one handle and inject another.
///
/// ```
/// use sorteohub_testing::InMemoryKeyValueStore;
/// use sorteohub_core::environment::KeyValueStore;
///
/// let storage = InMemoryKeyValueStore::new();
/// storage.set("token", "abc");
/// assert_eq!(storage.get("token").as_deref(), Some("abc"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryKeyValueStore {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    #[must_use]
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store.set(key, value);
        }
        store
    }

    /// Whether a key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().unwrap().contains_key(key)
    }

    /// Number of stored keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.read().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.data
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.data.write().unwrap().remove(key);
    }
}

/// Signal bus that records every published signal.
#[derive(Clone, Debug)]
pub struct RecordingSignalBus<S: Clone> {
    published: Arc<RwLock<Vec<S>>>,
    sender: broadcast::Sender<S>,
}

impl<S: Clone + Send + 'static> RecordingSignalBus<S> {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
            sender,
        }
    }

    /// Every signal published so far, in order
    #[must_use]
    pub fn published(&self) -> Vec<S> {
        self.published.read().unwrap().clone()
    }
}

impl<S: Clone + Send + 'static> Default for RecordingSignalBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + 'static> SignalBus<S> for RecordingSignalBus<S> {
    fn publish(&self, signal: S) -> Result<usize, SignalBusError> {
        self.published.write().unwrap().push(signal.clone());
        Ok(self.sender.send(signal).unwrap_or(0))
    }

    fn subscribe(&self) -> SignalStream<S> {
        let mut rx = self.sender.subscribe();
        Box::pin(stream! {
            loop {
                match rx.recv().await {
                    Ok(signal) => yield signal,
                    Err(broadcast::error::RecvError::Lagged(_)) => {},
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
