//! Simulated collaborators.
//!
//! In-process stand-ins for the real provisioning, health-probe, and backup
//! systems. Every operation succeeds immediately (no artificial latency);
//! each carries a failure switch so tests can exercise the engine's
//! failure-recovery paths.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use async_trait::async_trait;
use tracing::info;

use steward_core::{DatabaseSpec, HealthReport};

use crate::collaborators::{BackupTransport, HealthProbe, Provisioner};

/// Simulated provisioning backend.
#[derive(Default)]
pub struct SimProvisioner {
    failing: AtomicBool,
}

impl SimProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("simulated provisioner failure during {op}");
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for SimProvisioner {
    async fn create_volume(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("volume creation")?;
        info!(%name, storage = spec.storage().unwrap_or("?"), "creating persistent volume claim");
        Ok(())
    }

    async fn create_workload(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("workload creation")?;
        info!(
            %name,
            engine = spec.engine().unwrap_or("?"),
            version = spec.version().unwrap_or("?"),
            replicas = spec.replicas(),
            "creating stateful set"
        );
        Ok(())
    }

    async fn create_endpoint(&self, name: &str, _spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("endpoint creation")?;
        info!(%name, "creating service");
        Ok(())
    }

    async fn apply_config(&self, name: &str, _spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("config application")?;
        info!(%name, "creating config map");
        Ok(())
    }

    async fn await_workload_ready(&self, name: &str, _spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("workload admission")?;
        info!(%name, "waiting for pod to be admitted");
        Ok(())
    }

    async fn check_ready(&self, name: &str, _spec: &DatabaseSpec) -> anyhow::Result<bool> {
        self.check("readiness check")?;
        info!(%name, "readiness check passed");
        Ok(true)
    }

    async fn apply_update(&self, name: &str, spec: &DatabaseSpec) -> anyhow::Result<()> {
        self.check("update")?;
        info!(
            %name,
            version = spec.version().unwrap_or("?"),
            replicas = spec.replicas(),
            "applying updated spec"
        );
        Ok(())
    }

    async fn delete_workload(&self, name: &str) -> anyhow::Result<()> {
        self.check("workload deletion")?;
        info!(%name, "deleting stateful set");
        Ok(())
    }

    async fn delete_endpoint(&self, name: &str) -> anyhow::Result<()> {
        self.check("endpoint deletion")?;
        info!(%name, "deleting service");
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> anyhow::Result<()> {
        self.check("volume deletion")?;
        info!(%name, "deleting persistent volume claim");
        Ok(())
    }
}

/// Simulated health probe returning a canned healthy report.
#[derive(Default)]
pub struct SimHealthProbe {
    failing: AtomicBool,
}

impl SimHealthProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl HealthProbe for SimHealthProbe {
    async fn probe(&self, name: &str, _spec: &DatabaseSpec) -> anyhow::Result<HealthReport> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("simulated probe failure for {name}");
        }
        Ok(HealthReport {
            status: "healthy".to_string(),
            uptime: "1h 23m".to_string(),
            connections: 15,
            storage_used: "2.3 GB".to_string(),
        })
    }
}

/// Simulated backup transport.
#[derive(Default)]
pub struct SimBackupTransport {
    failing: AtomicBool,
}

impl SimBackupTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self, op: &str) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("simulated backup transport failure during {op}");
        }
        Ok(())
    }
}

#[async_trait]
impl BackupTransport for SimBackupTransport {
    async fn snapshot(&self, name: &str) -> anyhow::Result<()> {
        self.check("snapshot")?;
        info!(%name, "creating snapshot");
        Ok(())
    }

    async fn upload(&self, backup_id: &str) -> anyhow::Result<()> {
        self.check("upload")?;
        info!(%backup_id, "uploading to object storage");
        Ok(())
    }
}
