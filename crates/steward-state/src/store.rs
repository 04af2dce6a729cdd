//! ResourceStore: the name to resource registry.
//!
//! Owns the mapping from resource name to [`DatabaseResource`] and enforces
//! name uniqueness. Listing returns resources in insertion order. Mutation
//! happens through [`ResourceStore::update`], which applies a closure under
//! the write lock so callers never observe a half-applied resource.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use steward_core::{DatabaseResource, OperatorError, OperatorResult};

#[derive(Default)]
struct StoreInner {
    resources: HashMap<String, DatabaseResource>,
    /// Names in insertion order, for deterministic listing.
    order: Vec<String>,
}

/// Thread-safe in-memory resource registry.
#[derive(Clone, Default)]
pub struct ResourceStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl ResourceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new resource. Fails if the name is already present.
    pub async fn insert(&self, resource: DatabaseResource) -> OperatorResult<()> {
        let mut inner = self.inner.write().await;
        if inner.resources.contains_key(&resource.name) {
            return Err(OperatorError::AlreadyExists(resource.name.clone()));
        }
        inner.order.push(resource.name.clone());
        debug!(name = %resource.name, "resource inserted");
        inner.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    /// Get a snapshot of a resource by name.
    pub async fn get(&self, name: &str) -> OperatorResult<DatabaseResource> {
        let inner = self.inner.read().await;
        inner
            .resources
            .get(name)
            .cloned()
            .ok_or_else(|| OperatorError::NotFound(name.to_string()))
    }

    /// Check whether a resource exists.
    pub async fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().await;
        inner.resources.contains_key(name)
    }

    /// Apply a mutation to a resource under the write lock.
    ///
    /// Returns whatever the closure returns. Fails with `NotFound` if the
    /// name is absent; the closure is then never invoked.
    pub async fn update<R>(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut DatabaseResource) -> R,
    ) -> OperatorResult<R> {
        let mut inner = self.inner.write().await;
        let resource = inner
            .resources
            .get_mut(name)
            .ok_or_else(|| OperatorError::NotFound(name.to_string()))?;
        Ok(mutate(resource))
    }

    /// Remove a resource. Only the Deleting-phase handler calls this;
    /// external callers go through the delete operation instead.
    pub async fn remove(&self, name: &str) -> OperatorResult<()> {
        let mut inner = self.inner.write().await;
        if inner.resources.remove(name).is_none() {
            return Err(OperatorError::NotFound(name.to_string()));
        }
        inner.order.retain(|n| n != name);
        debug!(%name, "resource removed");
        Ok(())
    }

    /// Snapshot all resources in insertion order.
    pub async fn list(&self) -> Vec<DatabaseResource> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|name| inner.resources.get(name).cloned())
            .collect()
    }

    /// Number of resources currently registered.
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.resources.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
