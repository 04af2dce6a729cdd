//! EventLog: append-only history of reconciliation outcomes.
//!
//! Each record captures the resource name, the phase at the time of the
//! record, and an action tag. Records are immutable once appended and the
//! log is never reordered; readers see a consistent prefix of the append
//! order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use steward_core::ResourcePhase;

/// What happened to a resource, recorded alongside its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Resource accepted into the store.
    Created,
    /// A reconcile pass completed its handler.
    Reconciled,
    /// A reconcile pass failed (collaborator error or timeout); the phase
    /// was left unchanged.
    ReconcileFailed,
    /// An accepted spec update (non-empty change set).
    SpecUpdated,
    /// A backup finished snapshot + upload.
    BackupCompleted,
    /// A backup failed in the transport collaborator.
    BackupFailed,
    /// Teardown completed and the resource left the store.
    Deleted,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventAction::Created => "created",
            EventAction::Reconciled => "reconciled",
            EventAction::ReconcileFailed => "reconcile_failed",
            EventAction::SpecUpdated => "spec_updated",
            EventAction::BackupCompleted => "backup_completed",
            EventAction::BackupFailed => "backup_failed",
            EventAction::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One immutable history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub resource: String,
    pub phase: ResourcePhase,
    pub action: EventAction,
}

/// Append-only, globally ordered event history.
#[derive(Clone, Default)]
pub struct EventLog {
    inner: Arc<RwLock<Vec<Event>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. The write lock makes the append atomic with respect
    /// to readers; they never see a partial or reordered write.
    pub async fn append(
        &self,
        resource: &str,
        phase: ResourcePhase,
        action: EventAction,
        timestamp: DateTime<Utc>,
    ) {
        let mut events = self.inner.write().await;
        events.push(Event {
            timestamp,
            resource: resource.to_string(),
            phase,
            action,
        });
    }

    /// The last `n` events, oldest first.
    pub async fn tail(&self, n: usize) -> Vec<Event> {
        let events = self.inner.read().await;
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// Total number of records appended so far.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether nothing has been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
