//! Whole-snapshot replacement for concurrent readers
//!
//! The engine serves many concurrent read queries against one immutable
//! [`GraphStore`]. A structural change to the underlying codebase triggers a
//! full rebuild; the new store is swapped in atomically while in-flight
//! queries keep the snapshot they started with. There is no partial-write
//! path: replacement is the only mutation.

use std::sync::{Arc, RwLock};

use super::GraphStore;

/// Versioned pointer to the current graph snapshot.
pub struct GraphSnapshots {
    current: RwLock<Arc<GraphStore>>,
}

impl GraphSnapshots {
    pub fn new(store: GraphStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The current snapshot. The returned `Arc` stays valid across any
    /// number of later [`GraphSnapshots::replace`] calls.
    pub fn load(&self) -> Arc<GraphStore> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Install a freshly built store, returning the snapshot it replaced.
    pub fn replace(&self, store: GraphStore) -> Arc<GraphStore> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, Arc::new(store))
    }
}

impl Default for GraphSnapshots {
    fn default() -> Self {
        Self::new(GraphStore::empty())
    }
}
