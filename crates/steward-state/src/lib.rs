//! steward-state: shared mutable state for the Steward operator.
//!
//! Two structures live here, the only ones shared across tasks:
//!
//! - [`ResourceStore`]: name to [`DatabaseResource`] mapping with name
//!   uniqueness, existence checks, and insertion-ordered listing.
//! - [`EventLog`]: append-only ordered history of reconciliation outcomes,
//!   consumed by status reporting.
//!
//! Both are `Clone + Send + Sync` (backed by `Arc<RwLock<..>>`) and can be
//! shared across async tasks. Reads (`get`/`list`/`tail`) never block reads,
//! and proceed while a different resource's exclusive section is held;
//! per-resource exclusivity is the reconciler's concern, not the store's.
//!
//! All state is process-resident; there is no persistence across restarts.

pub mod events;
pub mod store;

pub use events::{Event, EventAction, EventLog};
pub use store::ResourceStore;
