//! The reconciliation engine: one convergence step per invocation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info, warn};

use steward_core::{Clock, DatabaseResource, OperatorResult, ResourcePhase};
use steward_state::{EventAction, EventLog, ResourceStore};

use crate::collaborators::{BackupTransport, HealthProbe, Provisioner};
use crate::lock::LockManager;

/// Dispatches a resource to the handler for its current phase.
///
/// `reconcile` is idempotent per invocation: repeated calls in a
/// self-looping phase (`Running`) only refresh health data. Collaborator
/// failures and timeouts never escape: the phase stays put and the failure
/// lands in `status.message` and the event log, so the next reconcile can
/// retry. The only caller-visible error is `NotFound` for an unknown
/// name, which performs no work and appends no event.
pub struct ReconcileEngine {
    store: ResourceStore,
    events: EventLog,
    provisioner: Arc<dyn Provisioner>,
    probe: Arc<dyn HealthProbe>,
    backup: Arc<dyn BackupTransport>,
    locks: Arc<LockManager>,
    clock: Arc<dyn Clock>,
    /// Per-collaborator-call timeout; elapsed counts as a handler failure.
    timeout: Duration,
}

impl ReconcileEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: ResourceStore,
        events: EventLog,
        provisioner: Arc<dyn Provisioner>,
        probe: Arc<dyn HealthProbe>,
        backup: Arc<dyn BackupTransport>,
        locks: Arc<LockManager>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            events,
            provisioner,
            probe,
            backup,
            locks,
            clock,
            timeout,
        }
    }

    /// Run one reconcile step under the resource's exclusive section.
    pub async fn reconcile(&self, name: &str) -> OperatorResult<()> {
        let _guard = self.locks.acquire(name).await;
        self.reconcile_locked(name).await
    }

    /// Run one reconcile step. The caller must already hold the per-name
    /// lock; the operations façade uses this to reconcile within the same
    /// exclusive section as the mutation that triggered it.
    pub async fn reconcile_locked(&self, name: &str) -> OperatorResult<()> {
        // Unknown name: report to the caller, no event.
        let resource = self.store.get(name).await?;
        let phase = resource.status.phase;
        debug!(%name, phase = %phase, "reconciling");

        let outcome = match phase {
            ResourcePhase::Pending => self.provision(&resource).await,
            ResourcePhase::Provisioning => self.check_provisioning(&resource).await,
            ResourcePhase::Running => self.monitor_health(&resource).await,
            ResourcePhase::Updating => self.apply_update(&resource).await,
            ResourcePhase::Deleting => self.teardown(&resource).await,
        };

        match outcome {
            Ok(()) if phase == ResourcePhase::Deleting => {
                // The resource has left the store; record against Deleting.
                self.events
                    .append(name, phase, EventAction::Deleted, self.clock.now())
                    .await;
            }
            Ok(()) => {
                let after = self.store.get(name).await?.status.phase;
                self.events
                    .append(name, after, EventAction::Reconciled, self.clock.now())
                    .await;
            }
            Err(e) => {
                warn!(%name, phase = %phase, error = %e, "reconcile failed, phase unchanged");
                self.store
                    .update(name, |r| {
                        r.status.message = format!("{phase} handler failed: {e:#}");
                    })
                    .await?;
                self.events
                    .append(name, phase, EventAction::ReconcileFailed, self.clock.now())
                    .await;
            }
        }

        Ok(())
    }

    // ── Phase handlers ─────────────────────────────────────────────

    /// Pending → Provisioning: issue the ordered provisioning operations.
    async fn provision(&self, resource: &DatabaseResource) -> anyhow::Result<()> {
        let name = &resource.name;
        let spec = &resource.spec;
        info!(
            %name,
            engine = spec.engine().unwrap_or("?"),
            version = spec.version().unwrap_or("?"),
            "provisioning database"
        );

        self.call("volume creation", self.provisioner.create_volume(name, spec))
            .await?;
        self.call("workload creation", self.provisioner.create_workload(name, spec))
            .await?;
        self.call("endpoint creation", self.provisioner.create_endpoint(name, spec))
            .await?;
        self.call("config application", self.provisioner.apply_config(name, spec))
            .await?;
        self.call(
            "workload admission",
            self.provisioner.await_workload_ready(name, spec),
        )
        .await?;

        self.store
            .update(name, |r| {
                r.set_phase(
                    ResourcePhase::Provisioning,
                    "Database provisioning in progress",
                );
            })
            .await?;
        Ok(())
    }

    /// Provisioning → Running: poll readiness; publish the connection string.
    async fn check_provisioning(&self, resource: &DatabaseResource) -> anyhow::Result<()> {
        let name = &resource.name;
        let spec = &resource.spec;

        let ready = self
            .call("readiness check", self.provisioner.check_ready(name, spec))
            .await?;

        if ready {
            let engine = spec.engine().context("spec is missing 'engine'")?;
            let connection_string = format!("{engine}://localhost:5432/{name}");
            info!(%name, %connection_string, "database is running");
            self.store
                .update(name, |r| {
                    r.set_phase(ResourcePhase::Running, "Database is ready");
                    r.status.connection_string = Some(connection_string);
                })
                .await?;
        } else {
            debug!(%name, "provisioning not yet complete");
            self.store
                .update(name, |r| {
                    r.status.message = "Waiting for provisioning to complete".to_string();
                })
                .await?;
        }
        Ok(())
    }

    /// Running self-loop: refresh health data, never change phase.
    async fn monitor_health(&self, resource: &DatabaseResource) -> anyhow::Result<()> {
        let name = &resource.name;
        let report = self
            .call("health probe", self.probe.probe(name, &resource.spec))
            .await?;

        debug!(%name, status = %report.status, connections = report.connections, "health refreshed");
        self.store
            .update(name, |r| r.status.health = Some(report))
            .await?;
        Ok(())
    }

    /// Updating → Running: apply the already-merged spec.
    async fn apply_update(&self, resource: &DatabaseResource) -> anyhow::Result<()> {
        let name = &resource.name;
        let spec = &resource.spec;
        info!(%name, version = spec.version().unwrap_or("?"), "applying update");

        self.call("update", self.provisioner.apply_update(name, spec))
            .await?;

        self.store
            .update(name, |r| {
                r.set_phase(ResourcePhase::Running, "Update completed successfully");
            })
            .await?;
        Ok(())
    }

    /// Deleting → gone: backup, then ordered teardown, then remove.
    async fn teardown(&self, resource: &DatabaseResource) -> anyhow::Result<()> {
        let name = &resource.name;
        info!(%name, "tearing down database");

        self.call("pre-teardown backup", self.backup.snapshot(name))
            .await?;
        self.call("workload deletion", self.provisioner.delete_workload(name))
            .await?;
        self.call("endpoint deletion", self.provisioner.delete_endpoint(name))
            .await?;
        self.call("volume deletion", self.provisioner.delete_volume(name))
            .await?;

        self.store.remove(name).await?;
        info!(%name, "database deleted");
        Ok(())
    }

    /// Bound a collaborator call by the configured timeout.
    async fn call<T>(
        &self,
        op: &str,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.with_context(|| format!("{op} failed")),
            Err(_) => anyhow::bail!("{op} timed out after {:?}", self.timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use steward_core::{DatabaseSpec, OperatorError, SystemClock};

    use crate::sim::{SimBackupTransport, SimHealthProbe, SimProvisioner};

    struct Fixture {
        engine: ReconcileEngine,
        store: ResourceStore,
        events: EventLog,
        provisioner: Arc<SimProvisioner>,
        probe: Arc<SimHealthProbe>,
    }

    fn fixture() -> Fixture {
        let store = ResourceStore::new();
        let events = EventLog::new();
        let provisioner = Arc::new(SimProvisioner::new());
        let probe = Arc::new(SimHealthProbe::new());
        let engine = ReconcileEngine::new(
            store.clone(),
            events.clone(),
            provisioner.clone(),
            probe.clone(),
            Arc::new(SimBackupTransport::new()),
            Arc::new(LockManager::new()),
            Arc::new(SystemClock),
            Duration::from_secs(5),
        );
        Fixture {
            engine,
            store,
            events,
            provisioner,
            probe,
        }
    }

    fn engine_with(provisioner: Arc<dyn Provisioner>) -> (ReconcileEngine, ResourceStore, EventLog) {
        let store = ResourceStore::new();
        let events = EventLog::new();
        let engine = ReconcileEngine::new(
            store.clone(),
            events.clone(),
            provisioner,
            Arc::new(SimHealthProbe::new()),
            Arc::new(SimBackupTransport::new()),
            Arc::new(LockManager::new()),
            Arc::new(SystemClock),
            Duration::from_secs(5),
        );
        (engine, store, events)
    }

    fn test_spec() -> DatabaseSpec {
        DatabaseSpec::from_iter([
            ("engine", "postgresql"),
            ("version", "14.9"),
            ("storage", "100Gi"),
        ])
    }

    async fn seed(store: &ResourceStore, name: &str) {
        let resource = DatabaseResource::new(name, test_spec(), chrono::Utc::now());
        store.insert(resource).await.unwrap();
    }

    #[tokio::test]
    async fn pending_becomes_running_in_two_reconciles() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;

        fx.engine.reconcile("prod-db").await.unwrap();
        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Provisioning);
        assert!(!resource.status.ready);

        fx.engine.reconcile("prod-db").await.unwrap();
        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Running);
        assert!(resource.status.ready);
        assert_eq!(
            resource.status.connection_string.as_deref(),
            Some("postgresql://localhost:5432/prod-db")
        );
    }

    #[tokio::test]
    async fn running_self_loop_refreshes_health_only() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.engine.reconcile("prod-db").await.unwrap();
        fx.engine.reconcile("prod-db").await.unwrap();

        fx.engine.reconcile("prod-db").await.unwrap();
        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Running);
        let health = resource.status.health.expect("health populated");
        assert_eq!(health.status, "healthy");

        // Another pass is a no-op apart from refreshed health.
        fx.engine.reconcile("prod-db").await.unwrap();
        let again = fx.store.get("prod-db").await.unwrap();
        assert_eq!(again.status.phase, ResourcePhase::Running);
        assert_eq!(again.metadata.generation, 1);
    }

    #[tokio::test]
    async fn provisioning_failure_keeps_pending() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.provisioner.set_failing(true);

        fx.engine.reconcile("prod-db").await.unwrap();
        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Pending);
        assert!(resource.status.message.contains("failed"));

        let events = fx.events.tail(10).await;
        assert_eq!(events.last().unwrap().action, EventAction::ReconcileFailed);

        // Failure is retryable: clear the fault and reconcile again.
        fx.provisioner.set_failing(false);
        fx.engine.reconcile("prod-db").await.unwrap();
        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Provisioning);
    }

    #[tokio::test]
    async fn probe_failure_keeps_running_and_records_event() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.engine.reconcile("prod-db").await.unwrap();
        fx.engine.reconcile("prod-db").await.unwrap();

        fx.probe.set_failing(true);
        fx.engine.reconcile("prod-db").await.unwrap();

        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Running);
        assert!(resource.status.message.contains("Running handler failed"));
        let events = fx.events.tail(1).await;
        assert_eq!(events[0].action, EventAction::ReconcileFailed);
        assert_eq!(events[0].phase, ResourcePhase::Running);
    }

    #[tokio::test]
    async fn unknown_name_is_not_found_and_appends_nothing() {
        let fx = fixture();

        let err = fx.engine.reconcile("ghost").await.unwrap_err();
        assert!(matches!(err, OperatorError::NotFound(_)));
        assert!(fx.events.is_empty().await);
    }

    #[tokio::test]
    async fn deleting_phase_removes_resource() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.store
            .update("prod-db", |r| {
                r.set_phase(ResourcePhase::Deleting, "Deletion in progress");
            })
            .await
            .unwrap();

        fx.engine.reconcile("prod-db").await.unwrap();

        assert!(!fx.store.contains("prod-db").await);
        let events = fx.events.tail(1).await;
        assert_eq!(events[0].action, EventAction::Deleted);
        assert_eq!(events[0].phase, ResourcePhase::Deleting);
    }

    #[tokio::test]
    async fn updating_phase_returns_to_running() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.store
            .update("prod-db", |r| {
                r.set_phase(ResourcePhase::Updating, "Applying spec update");
            })
            .await
            .unwrap();

        fx.engine.reconcile("prod-db").await.unwrap();

        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Running);
        assert!(resource.status.ready);
        assert_eq!(resource.status.message, "Update completed successfully");
    }

    #[tokio::test]
    async fn teardown_failure_stays_deleting_until_retry_succeeds() {
        let fx = fixture();
        seed(&fx.store, "prod-db").await;
        fx.store
            .update("prod-db", |r| {
                r.set_phase(ResourcePhase::Deleting, "Deletion in progress");
            })
            .await
            .unwrap();

        fx.provisioner.set_failing(true);
        fx.engine.reconcile("prod-db").await.unwrap();

        let resource = fx.store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Deleting);
        assert!(resource.status.message.contains("Deleting handler failed"));
        let tail = fx.events.tail(1).await;
        assert_eq!(tail[0].action, EventAction::ReconcileFailed);

        // The retry picks up where teardown left off and removes the resource.
        fx.provisioner.set_failing(false);
        fx.engine.reconcile("prod-db").await.unwrap();
        assert!(!fx.store.contains("prod-db").await);
        assert_eq!(fx.events.tail(1).await[0].action, EventAction::Deleted);
    }

    /// A provisioner whose calls never complete.
    struct HangingProvisioner;

    #[async_trait]
    impl Provisioner for HangingProvisioner {
        async fn create_volume(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn create_workload(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn create_endpoint(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn apply_config(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn await_workload_ready(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn check_ready(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<bool> {
            std::future::pending().await
        }
        async fn apply_update(&self, _: &str, _: &DatabaseSpec) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn delete_workload(&self, _: &str) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn delete_endpoint(&self, _: &str) -> anyhow::Result<()> {
            std::future::pending().await
        }
        async fn delete_volume(&self, _: &str) -> anyhow::Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn collaborator_timeout_is_a_handler_failure() {
        let (engine, store, events) = engine_with(Arc::new(HangingProvisioner));
        seed(&store, "prod-db").await;

        engine.reconcile("prod-db").await.unwrap();

        let resource = store.get("prod-db").await.unwrap();
        assert_eq!(resource.status.phase, ResourcePhase::Pending);
        assert!(resource.status.message.contains("timed out"));
        let tail = events.tail(1).await;
        assert_eq!(tail[0].action, EventAction::ReconcileFailed);
    }

    #[tokio::test]
    async fn reconciles_on_distinct_names_run_concurrently() {
        let fx = fixture();
        seed(&fx.store, "db-a").await;
        seed(&fx.store, "db-b").await;

        let engine = Arc::new(fx.engine);
        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reconcile("db-a").await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.reconcile("db-b").await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();
        })
        .await
        .expect("reconciles on distinct names must not block each other");
    }
}
