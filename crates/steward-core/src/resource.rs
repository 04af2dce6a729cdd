//! The managed resource: desired spec, observed status, metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::phase::ResourcePhase;
use crate::spec::DatabaseSpec;

/// Health sub-status reported by the health-probe collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Overall verdict, e.g. `healthy`.
    pub status: String,
    /// Human-readable uptime, e.g. `1h 23m`.
    pub uptime: String,
    /// Active connection count.
    pub connections: u32,
    /// Human-readable storage usage, e.g. `2.3 GB`.
    pub storage_used: String,
}

/// Observed state of a managed database.
///
/// `ready` is true if and only if `phase == Running`; every status mutation
/// in the engine and the operations façade maintains this invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub phase: ResourcePhase,
    pub ready: bool,
    pub message: String,
    /// Present only after at least one successful health probe.
    pub health: Option<HealthReport>,
    /// Present only once provisioning has completed.
    pub connection_string: Option<String>,
}

/// Resource metadata, set by the operator rather than the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    /// Set once at creation, never changed.
    pub created_at: DateTime<Utc>,
    /// Starts at 1; incremented by exactly 1 per accepted spec mutation.
    pub generation: u64,
}

/// One managed database: the unit the store owns and the engine reconciles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseResource {
    /// Unique store key, immutable after creation.
    pub name: String,
    pub spec: DatabaseSpec,
    pub status: ResourceStatus,
    pub metadata: ResourceMeta,
}

impl DatabaseResource {
    /// Build a freshly created resource: phase `Pending`, generation 1.
    pub fn new(name: impl Into<String>, spec: DatabaseSpec, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            spec,
            status: ResourceStatus {
                phase: ResourcePhase::Pending,
                ready: false,
                message: "Waiting for reconciliation".to_string(),
                health: None,
                connection_string: None,
            },
            metadata: ResourceMeta {
                created_at,
                generation: 1,
            },
        }
    }

    /// Move to a new phase, keeping the `ready <=> Running` invariant.
    pub fn set_phase(&mut self, phase: ResourcePhase, message: impl Into<String>) {
        self.status.phase = phase;
        self.status.ready = phase == ResourcePhase::Running;
        self.status.message = message.into();
    }
}
