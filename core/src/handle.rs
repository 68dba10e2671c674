use crate::index::Index;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared pointer to the currently served [`Index`].
///
/// Readers take an `Arc` snapshot and never hold the lock while scoring; a rebuild
/// swaps the pointer, so in-flight reads finish against the snapshot they started with.
#[derive(Clone)]
pub struct IndexHandle {
    inner: Arc<RwLock<Arc<Index>>>,
}

impl IndexHandle {
    pub fn new(index: Index) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(index))) }
    }

    pub fn current(&self) -> Arc<Index> {
        self.inner.read().clone()
    }

    /// Install a fully built index, returning the one it replaced.
    pub fn replace(&self, index: Index) -> Arc<Index> {
        let next = Arc::new(index);
        let mut guard = self.inner.write();
        tracing::debug!(old_count = guard.len(), new_count = next.len(), "swapping served index");
        std::mem::replace(&mut *guard, next)
    }
}
