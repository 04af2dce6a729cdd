//! steward-core: domain types for the Steward database operator.
//!
//! A managed database is represented as a [`DatabaseResource`]: a caller
//! supplied desired state ([`DatabaseSpec`], open schema), an operator
//! maintained observed state ([`ResourceStatus`]), and metadata (creation
//! timestamp, spec generation). The resource moves through a closed set of
//! lifecycle phases ([`ResourcePhase`]) driven by the reconciliation engine
//! in `steward-reconciler`.
//!
//! This crate carries no async machinery and no I/O; it is the shared
//! vocabulary of the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod phase;
pub mod resource;
pub mod spec;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::OperatorConfig;
pub use error::{OperatorError, OperatorResult};
pub use phase::ResourcePhase;
pub use resource::{DatabaseResource, HealthReport, ResourceMeta, ResourceStatus};
pub use spec::DatabaseSpec;
