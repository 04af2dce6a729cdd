//! steward-ops: the operations façade of the Steward operator.
//!
//! External callers (a CLI, an HTTP layer, a demo driver) talk to the
//! [`Operator`]: it validates and mutates resources, triggers the
//! reconciliation engine, and exposes read-only status views. Every
//! mutating operation runs inside the resource's exclusive section, so a
//! spec update and its synchronous reconcile form one logical transaction.

pub mod operator;
pub mod view;

pub use operator::Operator;
pub use view::DatabaseStatusView;
