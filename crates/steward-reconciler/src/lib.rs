//! steward-reconciler: the control loop for managed databases.
//!
//! The [`ReconcileEngine`] looks up a resource, dispatches to the handler
//! for its current phase, and records the outcome in the event log:
//!
//! ```text
//! ReconcileEngine::reconcile(name)
//!   ├── per-name lock (one handler in flight per resource)
//!   ├── dispatch on ResourcePhase (exhaustive)
//!   │   ├── Pending      → provision      → Provisioning
//!   │   ├── Provisioning → check readiness → Running
//!   │   ├── Running      → health probe    → Running (self-loop)
//!   │   ├── Updating     → apply update    → Running
//!   │   └── Deleting     → teardown        → removed from store
//!   └── EventLog::append (reconciled / reconcile_failed / deleted)
//! ```
//!
//! Provisioning, health probing, and backup transport are abstract
//! collaborators ([`Provisioner`], [`HealthProbe`], [`BackupTransport`]);
//! every call is bounded by a timeout, and a failure or timeout leaves the
//! resource's phase unchanged so the next reconcile retries it. No error
//! escapes a handler; only an unknown name fails a reconcile.

pub mod collaborators;
pub mod engine;
pub mod lock;
pub mod sim;

pub use collaborators::{BackupTransport, HealthProbe, Provisioner};
pub use engine::ReconcileEngine;
pub use lock::LockManager;
pub use sim::{SimBackupTransport, SimHealthProbe, SimProvisioner};
