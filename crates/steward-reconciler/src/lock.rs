//! Per-resource lock manager.
//!
//! At most one reconcile, spec update, scale, or delete may be in flight
//! for a given resource name; operations on different names never block
//! each other. Locks are created lazily and the same name always maps to
//! the same lock for the lifetime of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily-populated map of name → async mutex.
#[derive(Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive section for a resource name, waiting if another
    /// operation on the same name is in flight. The returned guard releases
    /// on drop.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
