//! Error types for operator-facing operations.

use thiserror::Error;

/// Result type alias for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

/// Errors reported to callers of the operations API.
///
/// Collaborator failures during reconciliation (provisioning, health probes,
/// backup transport) are deliberately *not* part of this taxonomy: they are
/// recovered locally by leaving the resource phase unchanged and are surfaced
/// through the event log and the resource's status message instead.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("invalid spec: {0}")]
    Validation(String),

    #[error("database not found: {0}")]
    NotFound(String),

    #[error("database already exists: {0}")]
    AlreadyExists(String),
}
