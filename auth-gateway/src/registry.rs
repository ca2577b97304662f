use crate::namespace::Namespace;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

/// Store and active model backing a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StoreBinding {
    pub store_id: String,
    pub model_id: String,
}

impl StoreBinding {
    pub fn new(store_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            model_id: model_id.into(),
        }
    }
}

/// Namespace to [`StoreBinding`] index owned by one gateway instance.
///
/// Every method is a single map operation under the lock; callers never hold
/// the lock while talking to the engine.
#[derive(Debug, Default)]
pub struct StoreRegistry {
    bindings: Mutex<HashMap<Namespace, StoreBinding>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, namespace: &Namespace) -> Option<StoreBinding> {
        self.bindings.lock().get(namespace).cloned()
    }

    /// Insert or overwrite; returns the binding that was replaced.
    pub fn insert(&self, namespace: Namespace, binding: StoreBinding) -> Option<StoreBinding> {
        self.bindings.lock().insert(namespace, binding)
    }

    /// Remove the binding only if it is still `stale`.
    ///
    /// Returns false when the entry is absent or was already replaced.
    pub fn invalidate(&self, namespace: &Namespace, stale: &StoreBinding) -> bool {
        let mut bindings = self.bindings.lock();
        if bindings.get(namespace) == Some(stale) {
            bindings.remove(namespace);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.lock().is_empty()
    }

    /// Copy of all bindings, ordered by namespace.
    pub fn snapshot(&self) -> Vec<(Namespace, StoreBinding)> {
        let mut entries: Vec<_> = self
            .bindings
            .lock()
            .iter()
            .map(|(namespace, binding)| (namespace.clone(), binding.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
