use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::listener::Listener;

/// Shared listener map. Cloning shares the underlying map.
///
/// Every access takes a shard lock for the duration of a map operation only;
/// callers snapshot `Arc<Listener>` handles and do their I/O afterwards.
#[derive(Clone, Default)]
pub(crate) struct Registry {
    listeners: Arc<DashMap<String, Arc<Listener>>>,
}

impl Registry {
    pub(crate) fn insert(&self, listener: Arc<Listener>) {
        self.listeners.insert(listener.id().to_string(), listener);
    }

    /// Remove `id` if present. Safe to call redundantly.
    pub(crate) fn evict(&self, id: &str) -> Option<Arc<Listener>> {
        let removed = self.listeners.remove(id).map(|(_, listener)| listener);
        if removed.is_some() {
            debug!(listener = %id, "Evicted event listener");
        }
        removed
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<Listener>> {
        self.listeners.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Listener>> {
        self.listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub(crate) fn drain(&self) -> Vec<Arc<Listener>> {
        let ids: Vec<String> = self.listeners.iter().map(|e| e.key().clone()).collect();
        ids.iter().filter_map(|id| self.evict(id)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}
