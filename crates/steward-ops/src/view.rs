//! Read-only status views for callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use steward_core::{DatabaseResource, HealthReport, ResourcePhase};

/// Flattened snapshot of one resource, as returned by get/list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseStatusView {
    pub name: String,
    pub engine: String,
    pub version: String,
    pub storage: String,
    pub replicas: u64,
    pub phase: ResourcePhase,
    pub ready: bool,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub generation: u64,
    /// Absent until the first successful health probe.
    pub health: Option<HealthReport>,
    /// Absent until provisioning completes.
    pub connection_string: Option<String>,
}

impl From<&DatabaseResource> for DatabaseStatusView {
    fn from(resource: &DatabaseResource) -> Self {
        Self {
            name: resource.name.clone(),
            engine: resource.spec.engine().unwrap_or_default().to_string(),
            version: resource.spec.version().unwrap_or_default().to_string(),
            storage: resource.spec.storage().unwrap_or_default().to_string(),
            replicas: resource.spec.replicas(),
            phase: resource.status.phase,
            ready: resource.status.ready,
            message: resource.status.message.clone(),
            created_at: resource.metadata.created_at,
            generation: resource.metadata.generation,
            health: resource.status.health.clone(),
            connection_string: resource.status.connection_string.clone(),
        }
    }
}
