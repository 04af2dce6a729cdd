//! Collaborator seams for provisioning, health probing, and backups.
//!
//! The engine invokes these abstractly and knows nothing about their
//! internals, only that each call may fail or hang (the engine applies
//! the timeout). Real implementations would talk to an orchestrator API;
//! the `sim` module provides in-process stand-ins.

use async_trait::async_trait;

use steward_core::{DatabaseSpec, HealthReport};

/// Provisions, updates, and tears down the infrastructure behind a database.
///
/// The Pending-phase handler issues the five creation steps in order; the
/// Deleting-phase handler issues the three deletion steps in order (after
/// the pre-teardown backup).
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the persistent volume backing the database.
    async fn create_volume(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Create the stateful workload running the engine.
    async fn create_workload(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Create the network endpoint fronting the workload.
    async fn create_endpoint(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Apply engine configuration.
    async fn apply_config(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Block until the workload has been admitted (not necessarily ready).
    async fn await_workload_ready(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Poll whether provisioning has completed and the database is serving.
    async fn check_ready(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<bool>;

    /// Apply an already-merged spec to a running database.
    async fn apply_update(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()>;

    /// Tear down the stateful workload.
    async fn delete_workload(&self, name: &str) -> anyhow::Result<()>;

    /// Tear down the network endpoint.
    async fn delete_endpoint(&self, name: &str) -> anyhow::Result<()>;

    /// Tear down the persistent volume.
    async fn delete_volume(&self, name: &str) -> anyhow::Result<()>;
}

/// Probes a running database and reports its health.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<HealthReport>;
}

/// Moves backup data out of the database and into storage.
///
/// Snapshot and upload are two sequential steps; the backup identifier is
/// chosen by the caller, not the transport.
#[async_trait]
pub trait BackupTransport: Send + Sync {
    /// Take a snapshot of the named database.
    async fn snapshot(&self, name: &str) -> anyhow::Result<()>;

    /// Upload the snapshot under the given backup identifier.
    async fn upload(&self, backup_id: &str) -> anyhow::Result<()>;
}
