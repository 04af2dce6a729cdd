//! The resource lifecycle phase enumeration.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of a managed database resource.
///
/// The reconciliation engine dispatches on this with an exhaustive match;
/// no "unknown phase" is representable. A resource that has finished the
/// `Deleting` phase is removed from the store entirely, which acts as the
/// implicit terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourcePhase {
    /// Created, waiting for the first reconcile to start provisioning.
    Pending,
    /// Provisioning operations issued, waiting for readiness.
    Provisioning,
    /// Provisioned and serving; health is refreshed on each reconcile.
    Running,
    /// An accepted spec change is being applied.
    Updating,
    /// Teardown in progress; the resource is removed once it completes.
    Deleting,
}

impl std::fmt::Display for ResourcePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourcePhase::Pending => "Pending",
            ResourcePhase::Provisioning => "Provisioning",
            ResourcePhase::Running => "Running",
            ResourcePhase::Updating => "Updating",
            ResourcePhase::Deleting => "Deleting",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_kubernetes_convention() {
        assert_eq!(ResourcePhase::Pending.to_string(), "Pending");
        assert_eq!(ResourcePhase::Running.to_string(), "Running");
        assert_eq!(ResourcePhase::Deleting.to_string(), "Deleting");
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&ResourcePhase::Provisioning).unwrap();
        assert_eq!(json, "\"provisioning\"");
        let phase: ResourcePhase = serde_json::from_str(&json).unwrap();
        assert_eq!(phase, ResourcePhase::Provisioning);
    }
}
