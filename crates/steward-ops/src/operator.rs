//! The Operator, the façade external callers use.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use steward_core::{
    Clock, DatabaseResource, DatabaseSpec, OperatorConfig, OperatorResult, ResourcePhase,
    SystemClock,
};
use steward_reconciler::{
    BackupTransport, HealthProbe, LockManager, Provisioner, ReconcileEngine, SimBackupTransport,
    SimHealthProbe, SimProvisioner,
};
use steward_state::{EventAction, EventLog, ResourceStore};

use crate::view::DatabaseStatusView;

/// Manages the full lifecycle of declared databases.
///
/// Owns the resource store, the event log, and the reconciliation engine.
/// All mutating operations take the per-resource exclusive section first;
/// operations on different names proceed concurrently.
pub struct Operator {
    store: ResourceStore,
    events: EventLog,
    engine: ReconcileEngine,
    locks: Arc<LockManager>,
    backup: Arc<dyn BackupTransport>,
    clock: Arc<dyn Clock>,
    collaborator_timeout: Duration,
}

impl Operator {
    /// Create an operator wired to the simulated collaborators and the
    /// system clock.
    pub fn new(config: OperatorConfig) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(SimProvisioner::new()),
            Arc::new(SimHealthProbe::new()),
            Arc::new(SimBackupTransport::new()),
            Arc::new(SystemClock),
        )
    }

    /// Create an operator with explicit collaborators and clock.
    pub fn with_collaborators(
        config: OperatorConfig,
        provisioner: Arc<dyn Provisioner>,
        probe: Arc<dyn HealthProbe>,
        backup: Arc<dyn BackupTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = ResourceStore::new();
        let events = EventLog::new();
        let locks = Arc::new(LockManager::new());
        let collaborator_timeout = config.collaborator_timeout();
        let engine = ReconcileEngine::new(
            store.clone(),
            events.clone(),
            provisioner,
            probe,
            backup.clone(),
            locks.clone(),
            clock.clone(),
            collaborator_timeout,
        );
        Self {
            store,
            events,
            engine,
            locks,
            backup,
            clock,
            collaborator_timeout,
        }
    }

    /// The event history, for status reporting.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Create a new database resource in phase `Pending`, generation 1.
    ///
    /// The first reconcile is left to the caller (or a reconcile loop); a
    /// fresh resource converges Pending → Provisioning → Running in exactly
    /// two reconcile passes.
    pub async fn create_database(
        &self,
        name: &str,
        spec: DatabaseSpec,
    ) -> OperatorResult<DatabaseResource> {
        spec.validate()?;

        let _guard = self.locks.acquire(name).await;
        let resource = DatabaseResource::new(name, spec, self.clock.now());
        self.store.insert(resource.clone()).await?;
        self.events
            .append(name, ResourcePhase::Pending, EventAction::Created, self.clock.now())
            .await;

        info!(
            %name,
            engine = resource.spec.engine().unwrap_or("?"),
            "database resource created"
        );
        Ok(resource)
    }

    /// Update the desired spec of a database.
    ///
    /// Computes the changed-key set against the current spec. An identical
    /// spec is a no-op: no merge, no generation bump, no phase change. A
    /// non-empty change set merges the new keys, bumps the generation by
    /// exactly one, moves the resource to `Updating`, and reconciles
    /// synchronously within the same exclusive section.
    pub async fn update_database(&self, name: &str, spec: DatabaseSpec) -> OperatorResult<()> {
        let _guard = self.locks.acquire(name).await;

        let current = self.store.get(name).await?;
        let changed = current.spec.diff(&spec);
        if changed.is_empty() {
            debug!(%name, "no changes detected, skipping update");
            return Ok(());
        }

        info!(%name, changed = ?changed, "spec update accepted");
        self.store
            .update(name, |r| {
                r.spec.merge(spec);
                r.metadata.generation += 1;
                r.set_phase(
                    ResourcePhase::Updating,
                    format!("Applying spec update ({})", changed.join(", ")),
                );
            })
            .await?;
        self.events
            .append(name, ResourcePhase::Updating, EventAction::SpecUpdated, self.clock.now())
            .await;

        self.engine.reconcile_locked(name).await
    }

    /// Scale a database to the given replica count.
    ///
    /// Scaling is routed through the spec-update protocol rather than
    /// mutating `spec.replicas` directly, so it carries the same guarantees
    /// as any other spec change: a generation bump, the `Updating` phase,
    /// and a synchronous reconcile. Scaling to the current count is a no-op.
    pub async fn scale_database(&self, name: &str, replicas: u64) -> OperatorResult<()> {
        let mut spec = DatabaseSpec::new();
        spec.set("replicas", replicas);
        self.update_database(name, spec).await
    }

    /// Delete a database: move it to `Deleting` and reconcile synchronously.
    ///
    /// The Deleting-phase handler performs the ordered teardown and removes
    /// the resource from the store; if a teardown step fails, the resource
    /// stays in `Deleting` and the next reconcile retries.
    pub async fn delete_database(&self, name: &str) -> OperatorResult<()> {
        let _guard = self.locks.acquire(name).await;

        self.store
            .update(name, |r| {
                r.set_phase(ResourcePhase::Deleting, "Deletion in progress");
            })
            .await?;
        info!(%name, "deletion requested");

        self.engine.reconcile_locked(name).await
    }

    /// Trigger a backup and return its identifier.
    ///
    /// The identifier is `{name}-backup-{YYYYMMDD-HHMMSS}` from the
    /// operator's clock. Snapshot and upload run as two sequential
    /// collaborator steps; a transport failure does not fail the operation,
    /// it is recorded in the event log and the resource's status message,
    /// like any other collaborator failure. Phase and generation are never
    /// touched.
    pub async fn backup_database(&self, name: &str) -> OperatorResult<String> {
        let _guard = self.locks.acquire(name).await;

        let resource = self.store.get(name).await?;
        let stamp = self.clock.now().format("%Y%m%d-%H%M%S");
        let backup_id = format!("{name}-backup-{stamp}");
        info!(%name, %backup_id, "starting backup");

        let result = self.run_backup(name, &backup_id).await;
        let phase = resource.status.phase;
        match result {
            Ok(()) => {
                info!(%name, %backup_id, "backup complete");
                self.events
                    .append(name, phase, EventAction::BackupCompleted, self.clock.now())
                    .await;
            }
            Err(e) => {
                warn!(%name, %backup_id, error = %e, "backup failed");
                self.store
                    .update(name, |r| {
                        r.status.message = format!("Backup {backup_id} failed: {e:#}");
                    })
                    .await?;
                self.events
                    .append(name, phase, EventAction::BackupFailed, self.clock.now())
                    .await;
            }
        }

        Ok(backup_id)
    }

    /// Get the status view for one database.
    pub async fn get_status(&self, name: &str) -> OperatorResult<DatabaseStatusView> {
        let resource = self.store.get(name).await?;
        Ok(DatabaseStatusView::from(&resource))
    }

    /// List status views for all databases, in creation order.
    pub async fn list_databases(&self) -> Vec<DatabaseStatusView> {
        self.store
            .list()
            .await
            .iter()
            .map(DatabaseStatusView::from)
            .collect()
    }

    /// Run one reconcile step for a database.
    pub async fn reconcile(&self, name: &str) -> OperatorResult<()> {
        self.engine.reconcile(name).await
    }

    /// Snapshot then upload, each bounded by the collaborator timeout.
    async fn run_backup(&self, name: &str, backup_id: &str) -> anyhow::Result<()> {
        let timeout = self.collaborator_timeout;
        tokio::time::timeout(timeout, self.backup.snapshot(name))
            .await
            .map_err(|_| anyhow::anyhow!("snapshot timed out after {timeout:?}"))??;
        tokio::time::timeout(timeout, self.backup.upload(backup_id))
            .await
            .map_err(|_| anyhow::anyhow!("upload timed out after {timeout:?}"))??;
        Ok(())
    }
}
